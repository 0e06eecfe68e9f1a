use crate::{
  arena::Arena,
  block::{Block, HEADER_SIZE, MIN_PAYLOAD},
  index::{BlockIndex, BlockRef},
};

/// Shrinks the block at `offset` to `size` payload bytes and turns the slack
/// into a new free block, if the slack can hold a header plus a minimal
/// payload. Otherwise the block keeps its extra bytes.
///
/// `size` must already be aligned and no larger than the block. Returns
/// whether a remainder block was carved off.
pub fn split(
  arena: &mut Arena,
  offset: usize,
  size: usize,
  index: &mut BlockIndex,
) -> bool {
  let Some(mut block) = arena.header(offset) else {
    return false;
  };
  debug_assert!(block.size >= size);

  let slack = block.size - size;
  if slack < HEADER_SIZE + MIN_PAYLOAD {
    return false;
  }

  let remainder_offset = offset + HEADER_SIZE + size;
  let remainder = Block::new(slack - HEADER_SIZE, true, false, block.last);

  block.size = size;
  block.last = false;

  arena.store(offset, block);
  arena.store(remainder_offset, remainder);
  index.insert(
    arena.address_of(remainder_offset),
    BlockRef {
      arena: arena.id(),
      offset: remainder_offset,
    },
  );
  true
}
