use crate::{arena::Arena, block::HEADER_SIZE, index::BlockIndex};

/// Merges every run of address-adjacent free blocks in `arena` into its
/// first block. Returns how many blocks were absorbed.
///
/// A neighbour is only absorbed if its address is a live index entry, and a
/// run always stops at the block flagged `last`, so merges never cross into
/// another arena.
pub fn merge_pass(
  arena: &mut Arena,
  index: &mut BlockIndex,
) -> usize {
  let mut absorbed = 0;
  let mut offset = 0;

  while let Some(block) = arena.header(offset) {
    if block.free {
      absorbed += absorb_free_successors(arena, offset, index);
    }
    // Re-read: absorbing may have grown the block.
    let Some(block) = arena.header(offset) else {
      break;
    };
    if block.last {
      break;
    }
    offset += block.footprint();
  }

  absorbed
}

/// Grows the block at `offset` over each following free block until an
/// in-use neighbour or the end of the arena.
pub fn absorb_free_successors(
  arena: &mut Arena,
  offset: usize,
  index: &mut BlockIndex,
) -> usize {
  let Some(mut block) = arena.header(offset) else {
    return 0;
  };
  let mut absorbed = 0;

  while !block.last {
    let next_offset = offset + block.footprint();
    let next_address = arena.address_of(next_offset);
    if !index.contains(next_address) {
      break;
    }
    let Some(next) = arena.header(next_offset) else {
      break;
    };
    if !next.free {
      break;
    }

    block.size += HEADER_SIZE + next.size;
    block.last = next.last;
    index.remove(next_address);
    absorbed += 1;
  }

  if absorbed > 0 {
    arena.store(offset, block);
    log::debug!(
      "merged {absorbed} free block(s) into {:#x}, now {} bytes",
      arena.address_of(offset),
      block.size
    );
  }
  absorbed
}
