use std::{
  fmt,
  ptr::{self, NonNull},
};

use crate::{
  align::checked_align,
  arena::{Arena, Arenas},
  block::{BlockInfo, HEADER_SIZE},
  coalesce::{absorb_free_successors, merge_pass},
  config::HeapConfig,
  error::HeapError,
  first_fit::allocate_in_arena,
  index::{BlockIndex, BlockRef},
  split::split,
};

/// A first-fit heap over OS-mapped arenas.
///
/// Every allocation is a header-prefixed block inside some arena. Free blocks
/// are split on allocation and merged with their free neighbours on release,
/// so an arena never holds two address-adjacent free blocks.
///
/// The heap owns its arenas and unmaps them when dropped. It performs no
/// locking of any kind.
pub struct Heap {
  config: HeapConfig,
  arenas: Arenas,
  index: BlockIndex,
}

impl Heap {
  pub fn new() -> Self {
    Self::empty(HeapConfig::default())
  }

  pub fn with_config(config: HeapConfig) -> Result<Self, HeapError> {
    config.validate()?;
    Ok(Self::empty(config))
  }

  fn empty(config: HeapConfig) -> Self {
    Self {
      config,
      arenas: Arenas::new(),
      index: BlockIndex::new(),
    }
  }

  /// Allocates at least `size` bytes, 4 byte aligned.
  ///
  /// A zero `size` allocates nothing and returns `Ok(None)`. Fails with
  /// [`HeapError::OutOfMemory`] when no arena has room and a new one cannot
  /// be mapped.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<Option<NonNull<u8>>, HeapError> {
    if size == 0 {
      log::trace!("allocate(0) -> none");
      return Ok(None);
    }

    match self.place(size) {
      Ok(ptr) => {
        log::trace!("allocate({size}) -> {:p}", ptr);
        Ok(Some(ptr))
      }
      Err(err) => {
        log::warn!("allocate({size}) failed: {err}");
        Err(err)
      }
    }
  }

  fn place(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let out_of_memory = HeapError::OutOfMemory { requested: size };
    let size = checked_align(size).ok_or(out_of_memory.clone())?;

    for arena in self.arenas.iter_mut() {
      if let Some(ptr) = allocate_in_arena(arena, size, &mut self.index) {
        return Ok(ptr);
      }
    }

    let requested = size.checked_add(HEADER_SIZE).ok_or(out_of_memory.clone())?;
    let id = self
      .arenas
      .create(requested, &self.config, &mut self.index)
      .map_err(|_| out_of_memory.clone())?;

    allocate_in_arena(self.arenas.get_mut(id), size, &mut self.index).ok_or(out_of_memory)
  }

  /// Returns the block behind `ptr` to its arena and merges it with any free
  /// neighbours.
  ///
  /// Null and pointers this heap never handed out are ignored. Releasing a
  /// block twice, or releasing it after its memory was reused, is not
  /// detected.
  pub fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    if ptr.is_null() {
      return;
    }
    let Some(at) = self.find(ptr) else {
      log::warn!("release({:p}) ignored: not a block of this heap", ptr);
      return;
    };

    let arena = self.arenas.get_mut(at.arena);
    let Some(mut block) = arena.header(at.offset) else {
      return;
    };
    block.free = true;
    arena.store(at.offset, block);

    let merged = merge_pass(arena, &mut self.index);
    log::trace!("release({:p}) -> {} bytes freed, {merged} merged", ptr, block.size);
  }

  /// Resizes the block behind `ptr`, moving it only when it cannot grow in
  /// place.
  ///
  /// A null `ptr` behaves like [`Heap::allocate`]. A pointer this heap does
  /// not know yields `Ok(None)` and changes nothing. When the block has to
  /// move, the first `min(old, new)` bytes are copied over and the old block
  /// is released. If that move fails the original block is left exactly as
  /// it was.
  pub fn reallocate(
    &mut self,
    ptr: *mut u8,
    size: usize,
  ) -> Result<Option<NonNull<u8>>, HeapError> {
    if ptr.is_null() {
      return self.allocate(size);
    }
    let Some(at) = self.find(ptr) else {
      log::warn!("reallocate({:p}, {size}) ignored: not a block of this heap", ptr);
      return Ok(None);
    };
    let new_size = checked_align(size).ok_or(HeapError::OutOfMemory { requested: size })?;

    if self.resize_in_place(at, new_size) {
      log::trace!("reallocate({:p}, {size}) -> same pointer", ptr);
      return Ok(NonNull::new(ptr));
    }

    let old_size = match self.arenas.get(at.arena).header(at.offset) {
      Some(block) => block.size,
      None => return Ok(None),
    };
    let moved = match self.place(new_size) {
      Ok(moved) => moved,
      Err(err) => {
        log::warn!("reallocate({:p}, {size}) failed, block left in place: {err}", ptr);
        return Err(err);
      }
    };

    // SAFETY: both payloads are live blocks of this heap, each at least
    // `min(old_size, new_size)` bytes long, and distinct blocks never
    // overlap.
    unsafe {
      ptr::copy_nonoverlapping(ptr as *const u8, moved.as_ptr(), old_size.min(new_size));
    }
    self.release(ptr);

    log::trace!("reallocate({:p}, {size}) -> moved to {:p}", ptr, moved);
    Ok(Some(moved))
  }

  /// Shrinks the block, or grows it over free blocks directly after it.
  /// Leaves everything untouched and returns `false` if neither works.
  fn resize_in_place(
    &mut self,
    at: BlockRef,
    new_size: usize,
  ) -> bool {
    let arena = self.arenas.get_mut(at.arena);
    let Some(block) = arena.header(at.offset) else {
      return false;
    };

    if block.size < new_size {
      if block.size + free_run_after(arena, at.offset, &self.index) < new_size {
        return false;
      }
      absorb_free_successors(arena, at.offset, &mut self.index);
    }

    if split(arena, at.offset, new_size, &mut self.index) {
      // The new remainder may sit right in front of another free block.
      let remainder = at.offset + HEADER_SIZE + new_size;
      absorb_free_successors(arena, remainder, &mut self.index);
    }
    true
  }

  fn find(
    &self,
    ptr: *mut u8,
  ) -> Option<BlockRef> {
    let header = (ptr as usize).checked_sub(HEADER_SIZE)?;
    self.index.lookup(header)
  }

  /// Payload capacity of the live block behind `ptr`. Can exceed the size
  /// that was asked for, by alignment or by slack too small to split off.
  pub fn usable_size(
    &self,
    ptr: *mut u8,
  ) -> Option<usize> {
    let at = self.find(ptr)?;
    let block = self.arenas.get(at.arena).header(at.offset)?;
    (!block.free).then_some(block.size)
  }

  /// Merges adjacent free blocks in every arena. Returns the number of
  /// blocks absorbed; zero unless the heap was tampered with, since every
  /// release already merges.
  pub fn coalesce(&mut self) -> usize {
    self
      .arenas
      .iter_mut()
      .map(|arena| merge_pass(arena, &mut self.index))
      .sum()
  }

  /// Arenas newest first. Each one can list its blocks via [`Arena::blocks`].
  pub fn arenas(&self) -> impl Iterator<Item = &Arena> {
    self.arenas.iter()
  }

  /// Every block of every arena; arenas newest first, blocks in address
  /// order within an arena.
  pub fn list_blocks(&self) -> impl Iterator<Item = BlockInfo> + '_ {
    self.arenas.iter().flat_map(Arena::blocks)
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn arena_count(&self) -> usize {
    self.arenas.len()
  }

  /// Bytes held across all arenas, headers included.
  pub fn reserved_bytes(&self) -> usize {
    self.arenas.reserved()
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

/// Payload bytes (headers included) the free blocks right after `offset`
/// would add if absorbed.
fn free_run_after(
  arena: &Arena,
  offset: usize,
  index: &BlockIndex,
) -> usize {
  let mut extra = 0;
  let Some(mut block) = arena.header(offset) else {
    return 0;
  };
  let mut next_offset = offset;

  while !block.last {
    next_offset += block.footprint();
    if !index.contains(arena.address_of(next_offset)) {
      break;
    }
    match arena.header(next_offset) {
      Some(next) if next.free => {
        extra += next.footprint();
        block = next;
      }
      _ => break,
    }
  }
  extra
}

fn yes_no(flag: bool) -> &'static str {
  if flag { "Yes" } else { "No" }
}

impl fmt::Display for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for arena in self.arenas() {
      writeln!(
        f,
        "Arena at {:#x} with size {}",
        arena.base(),
        arena.size()
      )?;
      for block in arena.blocks() {
        writeln!(
          f,
          "  Block size: {}, Free: {}, First: {}, Last: {}",
          block.size,
          yes_no(block.free),
          yes_no(block.first),
          yes_no(block.last)
        )?;
      }
    }
    Ok(())
  }
}
