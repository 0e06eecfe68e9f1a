//! Randomised allocate / release / reallocate run.
//!
//! Every live block is filled with random bytes and remembered with an
//! additive checksum. Checksums are verified before each release, before
//! each reallocate and once more at the end, so any block that gets
//! clobbered by a neighbour shows up as a mismatch.
//!
//! Usage: `cargo run --example stress -- [iterations] [max_block_size]`

use std::{env, process::ExitCode, ptr::NonNull};

use rand::Rng;
use rarena::Heap;

struct TestBlock {
  ptr: NonNull<u8>,
  size: usize,
  checksum: u32,
}

fn checksum(
  ptr: NonNull<u8>,
  size: usize,
) -> u32 {
  // SAFETY: `ptr` is a live allocation of at least `size` bytes.
  let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
  bytes.iter().map(|&b| b as u32).sum()
}

fn fill_randomly(
  rng: &mut impl Rng,
  ptr: NonNull<u8>,
  size: usize,
) {
  // SAFETY: `ptr` is a live allocation of at least `size` bytes.
  let bytes = unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), size) };
  rng.fill(bytes);
}

fn verify(
  block: &TestBlock,
  when: &str,
) -> Result<(), String> {
  let actual = checksum(block.ptr, block.size);
  if actual != block.checksum {
    return Err(format!(
      "checksum mismatch {when} at {:p}: expected {}, found {actual}",
      block.ptr, block.checksum
    ));
  }
  Ok(())
}

fn run(
  iterations: usize,
  max_block_size: usize,
) -> Result<(), String> {
  let mut rng = rand::thread_rng();
  let mut heap = Heap::new();
  let mut blocks: Vec<TestBlock> = Vec::new();

  for _ in 0..iterations {
    match rng.gen_range(0..3) {
      0 => {
        let size = rng.gen_range(1..=max_block_size);
        log::info!("allocate(size={size})");
        match heap.allocate(size) {
          Ok(Some(ptr)) => {
            fill_randomly(&mut rng, ptr, size);
            blocks.push(TestBlock {
              ptr,
              size,
              checksum: checksum(ptr, size),
            });
          }
          Ok(None) => {}
          Err(err) => log::warn!("{err}"),
        }
      }
      1 if !blocks.is_empty() => {
        let index = rng.gen_range(0..blocks.len());
        verify(&blocks[index], "before release")?;
        let block = blocks.swap_remove(index);
        log::info!("release(ptr={:p}, size={})", block.ptr, block.size);
        heap.release(block.ptr.as_ptr());
      }
      2 if !blocks.is_empty() => {
        let index = rng.gen_range(0..blocks.len());
        verify(&blocks[index], "before reallocate")?;
        let new_size = rng.gen_range(1..=max_block_size);
        let block = &mut blocks[index];
        log::info!(
          "reallocate(ptr={:p}, old_size={}, new_size={new_size})",
          block.ptr,
          block.size
        );
        match heap.reallocate(block.ptr.as_ptr(), new_size) {
          Ok(Some(ptr)) => {
            fill_randomly(&mut rng, ptr, new_size);
            *block = TestBlock {
              ptr,
              size: new_size,
              checksum: checksum(ptr, new_size),
            };
          }
          Ok(None) => return Err(format!("reallocate lost track of {:p}", block.ptr)),
          Err(err) => log::warn!("{err}"),
        }
      }
      _ => {}
    }
    log::debug!("heap state:\n{heap}");
  }

  for block in &blocks {
    verify(block, "in final verification")?;
    heap.release(block.ptr.as_ptr());
  }

  println!(
    "stress run completed: {iterations} iterations, {} arena(s), {} bytes reserved",
    heap.arena_count(),
    heap.reserved_bytes()
  );
  print!("{heap}");
  Ok(())
}

fn main() -> ExitCode {
  env_logger::init();

  let mut args = env::args().skip(1);
  let iterations = args.next().and_then(|a| a.parse().ok()).unwrap_or(10_000);
  let max_block_size = args.next().and_then(|a| a.parse().ok()).unwrap_or(1024);

  match run(iterations, max_block_size) {
    Ok(()) => ExitCode::SUCCESS,
    Err(message) => {
      eprintln!("{message}");
      ExitCode::FAILURE
    }
  }
}
