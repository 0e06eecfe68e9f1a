use std::mem;

/// Header written in front of every payload inside an arena.
///
/// Payload sizes are only 4 byte aligned, so a header can land on an address
/// that is not aligned for `usize`. Headers are always moved in and out of
/// arena memory with unaligned loads and stores (see [`crate::arena::Arena`]).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block {
  /// Payload bytes following the header, excluding the header itself.
  pub size: usize,
  pub free: bool,
  /// Set on the block at offset 0 of its arena.
  pub first: bool,
  /// Set on the block whose footprint ends at the arena's end.
  pub last: bool,
}

/// Bytes taken by a [`Block`] header in front of each payload.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Smallest payload worth carving off as its own free block.
pub const MIN_PAYLOAD: usize = crate::align::ALIGNMENT;

const _: () = assert!(HEADER_SIZE % crate::align::ALIGNMENT == 0);

impl Block {
  pub fn new(
    size: usize,
    free: bool,
    first: bool,
    last: bool,
  ) -> Self {
    Self {
      size,
      free,
      first,
      last,
    }
  }

  /// Header plus payload.
  pub fn footprint(&self) -> usize {
    HEADER_SIZE + self.size
  }
}

/// Read-only snapshot of one block, as handed out by the diagnostic listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
  /// Address of the block header.
  pub address: usize,
  pub size: usize,
  pub free: bool,
  pub first: bool,
  pub last: bool,
}

impl BlockInfo {
  pub(crate) fn new(
    address: usize,
    block: Block,
  ) -> Self {
    Self {
      address,
      size: block.size,
      free: block.free,
      first: block.first,
      last: block.last,
    }
  }

  /// Address of the first payload byte.
  pub fn payload(&self) -> usize {
    self.address + HEADER_SIZE
  }

  /// Address one past the last payload byte.
  pub fn end(&self) -> usize {
    self.payload() + self.size
  }
}
