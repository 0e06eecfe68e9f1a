use std::ptr::NonNull;

use crate::{arena::Arena, index::BlockIndex, split::split};

/// Claims the first free block in `arena`, in address order, that can hold
/// `size` bytes. The block is split down to `size` when the slack is worth
/// keeping.
///
/// `size` must already be aligned. Returns the payload pointer, or `None` if
/// no block in the arena fits.
pub fn allocate_in_arena(
  arena: &mut Arena,
  size: usize,
  index: &mut BlockIndex,
) -> Option<NonNull<u8>> {
  let offset = find_free_block(arena, size)?;

  split(arena, offset, size, index);

  let mut block = arena.header(offset)?;
  block.free = false;
  arena.store(offset, block);

  NonNull::new(arena.payload(offset))
}

fn find_free_block(
  arena: &Arena,
  size: usize,
) -> Option<usize> {
  let mut offset = 0;
  while let Some(block) = arena.header(offset) {
    if block.free && block.size >= size {
      return Some(offset);
    }
    if block.last {
      break;
    }
    offset += block.footprint();
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    arena::Arenas,
    block::HEADER_SIZE,
    config::HeapConfig,
    index::ArenaId,
  };

  fn fresh() -> (Arenas, BlockIndex) {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();
    arenas.create(0, &HeapConfig::new(), &mut index).unwrap();
    (arenas, index)
  }

  #[test]
  fn consecutive_allocations_are_packed() {
    let (mut arenas, mut index) = fresh();
    let arena = arenas.get_mut(ArenaId(0));

    let a = allocate_in_arena(arena, 100, &mut index).unwrap();
    let b = allocate_in_arena(arena, 200, &mut index).unwrap();

    assert_eq!(a.as_ptr() as usize, arena.base() + HEADER_SIZE);
    assert_eq!(b.as_ptr() as usize, a.as_ptr() as usize + 100 + HEADER_SIZE);
    assert_eq!(index.len(), 3);
  }

  #[test]
  fn first_fit_prefers_lowest_address() {
    let (mut arenas, mut index) = fresh();
    let arena = arenas.get_mut(ArenaId(0));

    let a = allocate_in_arena(arena, 100, &mut index).unwrap();
    allocate_in_arena(arena, 8, &mut index).unwrap();

    let mut header = arena.header(0).unwrap();
    header.free = true;
    arena.store(0, header);

    // Fits in the freed 100 byte hole, ahead of the large tail block.
    let c = allocate_in_arena(arena, 60, &mut index).unwrap();
    assert_eq!(c, a);
    // 40 bytes of slack are enough for a header and a payload.
    assert_eq!(arena.header(0).unwrap().size, 60);
  }

  #[test]
  fn no_fit_returns_none() {
    let (mut arenas, mut index) = fresh();
    let arena = arenas.get_mut(ArenaId(0));

    assert!(allocate_in_arena(arena, 4096, &mut index).is_none());
    let whole = 4096 - HEADER_SIZE;
    assert!(allocate_in_arena(arena, whole, &mut index).is_some());
    assert!(allocate_in_arena(arena, 4, &mut index).is_none());
  }
}
