//! OS-backed arenas and the manager that creates them.
//!
//! ```text
//!   One arena:
//!
//!   base                                                      base + size
//!   ├────────┬──────────┬────────┬──────────────┬────────┬─────────────┤
//!   │ Block  │ payload  │ Block  │   payload    │ Block  │   payload   │
//!   │ first  │          │        │              │ last   │             │
//!   └────────┴──────────┴────────┴──────────────┴────────┴─────────────┘
//!    offset 0            offset = previous offset + HEADER_SIZE + size
//! ```
//!
//! Every header is addressed by its offset from the arena base. Header reads
//! and writes stay inside the crate and refuse offsets that would reach past
//! the end of the arena. Outside the crate an arena can only be inspected by
//! walking its block chain with [`Arena::blocks`], which never lands inside a
//! payload.

use std::ptr;

use crate::{
  align::checked_align,
  block::{Block, BlockInfo, HEADER_SIZE},
  config::HeapConfig,
  error::HeapError,
  index::{ArenaId, BlockIndex, BlockRef},
  os::Region,
};

/// One OS-backed region, carved into blocks.
///
/// Raw headers are not reachable from outside the crate; an offset chosen by
/// a caller could point into payload bytes:
///
/// ```compile_fail
/// let mut heap = rarena::Heap::new();
/// heap.allocate(64).unwrap();
/// let arena = heap.arenas().next().unwrap();
/// let _ = arena.header(rarena::HEADER_SIZE);
/// ```
pub struct Arena {
  id: ArenaId,
  region: Region,
  /// Bytes partitioned into blocks. May be less than the mapped length,
  /// which is rounded up to whole pages.
  size: usize,
}

impl Arena {
  pub fn id(&self) -> ArenaId {
    self.id
  }

  pub fn base(&self) -> usize {
    self.region.as_ptr() as usize
  }

  pub fn size(&self) -> usize {
    self.size
  }

  /// Bytes actually mapped from the OS, at least [`Arena::size`].
  pub fn mapped_len(&self) -> usize {
    self.region.len()
  }

  /// Whether `address` falls inside the partitioned part of this arena.
  pub fn contains(
    &self,
    address: usize,
  ) -> bool {
    address >= self.base() && address < self.base() + self.size
  }

  pub fn address_of(
    &self,
    offset: usize,
  ) -> usize {
    self.base() + offset
  }

  /// Reads the header at `offset`, or `None` if a header there would not fit
  /// inside the arena.
  pub(crate) fn header(
    &self,
    offset: usize,
  ) -> Option<Block> {
    if offset.checked_add(HEADER_SIZE)? > self.size {
      return None;
    }
    // SAFETY: the header lies within the mapping (checked above) and every
    // header the allocator reads was previously written by `store`.
    Some(unsafe { ptr::read_unaligned(self.region.as_ptr().add(offset) as *const Block) })
  }

  /// Writes `block` as the header at `offset`.
  ///
  /// # Panics
  ///
  /// Panics if the header, or the payload it describes, would extend past the
  /// end of the arena.
  pub(crate) fn store(
    &mut self,
    offset: usize,
    block: Block,
  ) {
    assert!(
      offset + block.footprint() <= self.size,
      "block at offset {offset} with size {} overruns arena of {} bytes",
      block.size,
      self.size
    );
    // SAFETY: bounds checked above; the arena exclusively owns the mapping.
    unsafe { ptr::write_unaligned(self.region.as_ptr().add(offset) as *mut Block, block) }
  }

  /// Pointer to the first payload byte of the block at `offset`.
  pub(crate) fn payload(
    &self,
    offset: usize,
  ) -> *mut u8 {
    debug_assert!(offset + HEADER_SIZE <= self.size);
    // SAFETY: in bounds, see above.
    unsafe { self.region.as_ptr().add(offset + HEADER_SIZE) }
  }

  /// Walks the arena's blocks in address order.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      arena: self,
      offset: 0,
    }
  }
}

/// Lazy, address-ordered walk over an arena's block headers.
pub struct Blocks<'a> {
  arena: &'a Arena,
  offset: usize,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let block = self.arena.header(self.offset)?;
    let info = BlockInfo::new(self.arena.address_of(self.offset), block);
    self.offset += block.footprint();
    Some(info)
  }
}

/// Owns every arena of a heap and creates new ones on demand.
#[derive(Default)]
pub(crate) struct Arenas {
  list: Vec<Arena>,
  /// Sum of all arena sizes.
  reserved: usize,
}

impl Arenas {
  pub fn new() -> Self {
    Self::default()
  }

  /// Maps a new arena of `align4(max(requested, min_arena_size))` bytes,
  /// seeds it with one free block spanning the whole arena and indexes that
  /// block.
  pub fn create(
    &mut self,
    requested: usize,
    config: &HeapConfig,
    index: &mut BlockIndex,
  ) -> Result<ArenaId, HeapError> {
    let out_of_memory = HeapError::OutOfMemory { requested };

    let size = checked_align(requested.max(config.min_arena_size)).ok_or(out_of_memory.clone())?;
    debug_assert!(size > HEADER_SIZE);

    if let Some(budget) = config.max_heap_bytes {
      let total = self.reserved.checked_add(size).ok_or(out_of_memory.clone())?;
      if total > budget {
        log::warn!(
          "arena of {size} bytes would exceed heap budget ({} of {budget} bytes reserved)",
          self.reserved
        );
        return Err(out_of_memory);
      }
    }

    let region = Region::map(size).ok_or(out_of_memory)?;
    let id = ArenaId(self.list.len());
    let mut arena = Arena { id, region, size };

    arena.store(0, Block::new(size - HEADER_SIZE, true, true, true));
    index.insert(arena.base(), BlockRef { arena: id, offset: 0 });

    log::debug!(
      "created arena {} at {:#x} with {} bytes",
      id.index(),
      arena.base(),
      size
    );

    self.reserved += size;
    self.list.push(arena);
    Ok(id)
  }

  pub fn get(
    &self,
    id: ArenaId,
  ) -> &Arena {
    &self.list[id.index()]
  }

  pub fn get_mut(
    &mut self,
    id: ArenaId,
  ) -> &mut Arena {
    &mut self.list[id.index()]
  }

  /// Arenas newest first, the order allocation searches them in.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arena> + ExactSizeIterator {
    self.list.iter().rev()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Arena> {
    self.list.iter_mut().rev()
  }

  pub fn len(&self) -> usize {
    self.list.len()
  }

  pub fn reserved(&self) -> usize {
    self.reserved
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config(min_arena_size: usize) -> HeapConfig {
    HeapConfig::default().with_min_arena_size(min_arena_size)
  }

  #[test]
  fn create_seeds_one_free_block() {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();

    let id = arenas.create(10, &config(4096), &mut index).unwrap();
    let arena = arenas.get(id);

    assert_eq!(arena.size(), 4096);
    assert!(arena.mapped_len() >= 4096);
    let blocks: Vec<_> = arena.blocks().collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].address, arena.base());
    assert_eq!(blocks[0].size, 4096 - HEADER_SIZE);
    assert!(blocks[0].free && blocks[0].first && blocks[0].last);
    assert_eq!(
      index.lookup(arena.base()),
      Some(BlockRef { arena: id, offset: 0 })
    );
  }

  #[test]
  fn create_honours_larger_request_and_aligns() {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();

    let id = arenas.create(10_001, &config(4096), &mut index).unwrap();
    assert_eq!(arenas.get(id).size(), 10_004);
    assert_eq!(arenas.reserved(), 10_004);
  }

  #[test]
  fn newest_arena_is_searched_first() {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();

    let a = arenas.create(0, &config(4096), &mut index).unwrap();
    let b = arenas.create(0, &config(4096), &mut index).unwrap();

    let order: Vec<_> = arenas.iter().map(Arena::id).collect();
    assert_eq!(order, vec![b, a]);
    assert_eq!(index.len(), 2);
  }

  #[test]
  fn budget_refuses_new_arena() {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();
    let config = config(4096).with_max_heap_bytes(Some(6000));

    arenas.create(0, &config, &mut index).unwrap();
    assert_eq!(
      arenas.create(0, &config, &mut index),
      Err(HeapError::OutOfMemory { requested: 0 })
    );
    assert_eq!(arenas.len(), 1);
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn header_past_end_is_none() {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();
    let id = arenas.create(0, &config(64), &mut index).unwrap();
    let arena = arenas.get(id);

    assert!(arena.header(0).is_some());
    assert!(arena.header(64 - HEADER_SIZE + 4).is_none());
    assert!(arena.header(usize::MAX).is_none());
  }

  #[test]
  #[should_panic(expected = "overruns arena")]
  fn store_past_end_panics() {
    let mut arenas = Arenas::new();
    let mut index = BlockIndex::new();
    let id = arenas.create(0, &config(64), &mut index).unwrap();

    arenas.get_mut(id).store(0, Block::new(64, true, true, true));
  }
}
