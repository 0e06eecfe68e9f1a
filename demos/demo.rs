use std::ptr::NonNull;

use rarena::{Heap, HeapError};

/// Prints the heap layout under a heading, one line per arena and block.
fn show(
  heap: &Heap,
  label: &str,
) {
  println!("{label}");
  print!("{heap}");
}

fn allocate(
  heap: &mut Heap,
  size: usize,
) -> Result<NonNull<u8>, HeapError> {
  let ptr = heap
    .allocate(size)?
    .ok_or(HeapError::OutOfMemory { requested: size })?;
  show(heap, &format!("allocate({size})"));
  Ok(ptr)
}

fn main() -> Result<(), HeapError> {
  env_logger::init();

  let mut heap = Heap::new();

  let p1 = allocate(&mut heap, 100)?;
  let p2 = allocate(&mut heap, 200)?;
  let _p3 = allocate(&mut heap, 300)?;

  heap.release(p1.as_ptr());
  show(&heap, "release(p1)");

  // p3 sits right after p2, so p2 cannot grow in place and moves to the tail.
  let moved = heap.reallocate(p2.as_ptr(), 400)?;
  show(&heap, "reallocate(p2, 400)");
  if let Some(moved) = moved {
    println!("p2 moved from {:p} to {:p}", p2, moved);
  }

  // Served from the hole left by p1 and the old p2.
  let p4 = allocate(&mut heap, 90)?;
  println!("allocate(90) reused p1's block: {}", p4 == p1);

  Ok(())
}
