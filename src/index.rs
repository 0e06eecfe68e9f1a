//! Reverse lookup from header address to the block living there.
//!
//! The index never owns memory. It only remembers which header addresses are
//! currently distinct blocks, and in which arena they sit, so that a user
//! pointer can be mapped back to its header and a coalescing pass can tell a
//! real neighbour from stray payload bytes.

use hashbrown::HashMap;

/// Position of an arena in creation order. Stable for the heap's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaId(pub(crate) usize);

impl ArenaId {
  pub fn index(self) -> usize {
    self.0
  }
}

/// Where a block header lives: which arena, and how far into it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockRef {
  pub arena: ArenaId,
  pub offset: usize,
}

#[derive(Default)]
pub(crate) struct BlockIndex {
  entries: HashMap<usize, BlockRef>,
}

impl BlockIndex {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(
    &mut self,
    address: usize,
    block: BlockRef,
  ) {
    let previous = self.entries.insert(address, block);
    debug_assert!(previous.is_none(), "block {address:#x} indexed twice");
  }

  pub fn remove(
    &mut self,
    address: usize,
  ) -> Option<BlockRef> {
    self.entries.remove(&address)
  }

  pub fn lookup(
    &self,
    address: usize,
  ) -> Option<BlockRef> {
    self.entries.get(&address).copied()
  }

  pub fn contains(
    &self,
    address: usize,
  ) -> bool {
    self.entries.contains_key(&address)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn at(arena: usize, offset: usize) -> BlockRef {
    BlockRef {
      arena: ArenaId(arena),
      offset,
    }
  }

  #[test]
  fn insert_lookup_remove() {
    let mut index = BlockIndex::new();
    assert_eq!(index.len(), 0);

    index.insert(0x1000, at(0, 0));
    index.insert(0x1040, at(0, 0x40));

    assert_eq!(index.len(), 2);
    assert_eq!(index.lookup(0x1040), Some(at(0, 0x40)));
    assert!(index.contains(0x1000));
    assert_eq!(index.lookup(0x2000), None);

    assert_eq!(index.remove(0x1000), Some(at(0, 0)));
    assert_eq!(index.remove(0x1000), None);
    assert!(!index.contains(0x1000));
    assert_eq!(index.len(), 1);
  }
}
