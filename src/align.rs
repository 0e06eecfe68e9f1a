/// Granularity every payload size is rounded up to.
pub const ALIGNMENT: usize = 4;

/// Rounds the given size up to the allocator's 4 byte granularity.
///
/// # Examples
///
/// ```rust
/// use rarena::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(13), 16);
/// assert_eq!(align!(16), 16);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGNMENT - 1) & !($crate::align::ALIGNMENT - 1)
  };
}

/// Like [`align!`], but returns `None` instead of wrapping when `size` is
/// within `ALIGNMENT` of `usize::MAX`.
pub fn checked_align(size: usize) -> Option<usize> {
  size
    .checked_add(ALIGNMENT - 1)
    .map(|value| value & !(ALIGNMENT - 1))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGNMENT * i + 1)..=(ALIGNMENT * (i + 1));

      let expected_alignment = ALIGNMENT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), checked_align(size));
      }
    }
  }

  #[test]
  fn checked_align_reports_overflow() {
    assert_eq!(checked_align(usize::MAX), None);
    assert_eq!(checked_align(usize::MAX - 2), None);
    assert_eq!(checked_align(0), Some(0));
  }
}
