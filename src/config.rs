//! Heap configuration parameters.

use crate::{
  block::{HEADER_SIZE, MIN_PAYLOAD},
  error::HeapError,
};

/// Configuration for a [`crate::Heap`].
///
/// Fixed at construction. The alignment granularity is not configurable; it
/// is always [`crate::align::ALIGNMENT`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeapConfig {
  /// Smallest arena requested from the OS, in bytes.
  ///
  /// Default: 4096. Requests that do not fit get an arena sized to the
  /// request instead.
  pub min_arena_size: usize,

  /// Upper bound on the bytes reserved across all arenas.
  ///
  /// Default: `None` (bounded only by what the OS will map). Once reached,
  /// allocations that need a new arena fail with `OutOfMemory`.
  pub max_heap_bytes: Option<usize>,
}

impl HeapConfig {
  pub const DEFAULT_MIN_ARENA_SIZE: usize = 4096;

  /// Smallest usable `min_arena_size`: one header and one minimal payload.
  pub const MIN_ARENA_SIZE_FLOOR: usize = HEADER_SIZE + MIN_PAYLOAD;

  pub fn new() -> Self {
    Self {
      min_arena_size: Self::DEFAULT_MIN_ARENA_SIZE,
      max_heap_bytes: None,
    }
  }

  pub fn with_min_arena_size(
    mut self,
    min_arena_size: usize,
  ) -> Self {
    self.min_arena_size = min_arena_size;
    self
  }

  pub fn with_max_heap_bytes(
    mut self,
    max_heap_bytes: Option<usize>,
  ) -> Self {
    self.max_heap_bytes = max_heap_bytes;
    self
  }

  pub fn validate(&self) -> Result<(), HeapError> {
    if self.min_arena_size < Self::MIN_ARENA_SIZE_FLOOR {
      return Err(HeapError::InvalidConfig(
        "min_arena_size must hold at least one header and one minimal payload",
      ));
    }
    if self.max_heap_bytes == Some(0) {
      return Err(HeapError::InvalidConfig("max_heap_bytes must be non-zero"));
    }
    Ok(())
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults() {
    let config = HeapConfig::default();
    assert_eq!(config.min_arena_size, 4096);
    assert_eq!(config.max_heap_bytes, None);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn tiny_arena_is_rejected() {
    let config = HeapConfig::new().with_min_arena_size(HEADER_SIZE);
    assert!(matches!(config.validate(), Err(HeapError::InvalidConfig(_))));

    let config = HeapConfig::new().with_min_arena_size(HeapConfig::MIN_ARENA_SIZE_FLOOR);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn zero_budget_is_rejected() {
    let config = HeapConfig::new().with_max_heap_bytes(Some(0));
    assert!(config.validate().is_err());
  }
}
