use std::{
  ptr::{self, NonNull},
  sync::LazyLock,
};

use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, mmap, munmap};

static PAGE_SIZE: LazyLock<usize> = LazyLock::new(page_size::get);

/// Round up `n` to the nearest multiple of `to`.
fn round_up(
  n: usize,
  to: usize,
) -> Option<usize> {
  n.checked_add(to - 1).map(|n| n / to * to)
}

/// A private, anonymous read/write mapping.
///
/// The kernel hands the pages out zeroed and never moves them, which is all
/// the allocator needs from the OS. The mapping lives until the region is
/// dropped.
pub struct Region {
  ptr: NonNull<u8>,
  len: usize,
}

impl Region {
  /// `mmap()` at least `size` bytes, rounded up to whole pages.
  ///
  /// Returns `None` if `size` is zero, the rounded length overflows, or the
  /// kernel refuses the mapping.
  pub fn map(size: usize) -> Option<Region> {
    if size == 0 {
      return None;
    }
    let len = round_up(size, *PAGE_SIZE)?;
    // SAFETY: a fresh anonymous mapping with no address hint cannot alias
    // anything else in the process.
    let ptr = unsafe {
      mmap(
        ptr::null_mut(),
        len,
        PROT_READ | PROT_WRITE,
        MAP_ANONYMOUS | MAP_PRIVATE,
        -1,
        0,
      )
    };
    if ptr == MAP_FAILED {
      log::warn!(
        "mmap({len}) failed: {}",
        std::io::Error::last_os_error()
      );
      return None;
    }
    NonNull::new(ptr as *mut u8).map(|ptr| Region { ptr, len })
  }

  pub fn as_ptr(&self) -> *mut u8 {
    self.ptr.as_ptr()
  }

  /// Mapped length in bytes; a whole number of pages.
  pub fn len(&self) -> usize {
    self.len
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    // SAFETY: `ptr` and `len` are exactly what `mmap()` returned and the
    // mapping has not been touched by anything else since.
    unsafe {
      munmap(self.ptr.as_ptr() as _, self.len);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn map_rounds_to_pages_and_zeroes() {
    let region = Region::map(100).unwrap();
    assert_eq!(region.len() % *PAGE_SIZE, 0);
    assert!(region.len() >= 100);

    let bytes = unsafe { std::slice::from_raw_parts(region.as_ptr(), region.len()) };
    assert!(bytes.iter().all(|&b| b == 0));
  }

  #[test]
  fn map_zero_is_refused() {
    assert!(Region::map(0).is_none());
  }

  #[test]
  fn map_absurd_size_is_refused() {
    assert!(Region::map(usize::MAX - 1).is_none());
    assert!(Region::map(usize::MAX / 2).is_none());
  }

  #[test]
  fn round_up_to_page() {
    assert_eq!(round_up(1, 4096), Some(4096));
    assert_eq!(round_up(4096, 4096), Some(4096));
    assert_eq!(round_up(4097, 4096), Some(8192));
    assert_eq!(round_up(usize::MAX, 4096), None);
  }
}
