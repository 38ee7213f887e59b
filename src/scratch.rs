//! # Scratch Heap
//!
//! A monotonic bump allocator inside one fixed backing-heap region. Each
//! allocation aligns the bump pointer up and advances it; there is no
//! per-allocation free, only a bulk [`ScratchHeap::reset`] that rewinds the
//! whole region in O(1).
//!
//! ```text
//!   base                     head                         tail
//!   ▼                        ▼                            ▼
//!   ┌────────┬───────┬───────┬────────────────────────────┐
//!   │   A1   │  A2   │  A3   │          free space        │
//!   └────────┴───────┴───────┴────────────────────────────┘
//!
//!   alloc(n, a): head = align_to(head, a); grant; head += n
//!   reset():     head = base
//! ```
//!
//! Useful for per-frame or per-request working memory where everything
//! dies at once.

use std::fmt;
use std::ptr;

use crate::align_to;
use crate::heap::Heap;

/// Reasons a [`ScratchHeap`] cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchError {
  /// The region size is zero.
  BadSize,
  /// The region alignment is zero or not a power of two.
  BadAlignment,
  /// The backing heap could not supply the region.
  OutOfMemory,
}

impl fmt::Display for ScratchError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(match self {
      ScratchError::BadSize => "region size must be non-zero",
      ScratchError::BadAlignment => "alignment is not a non-zero power of two",
      ScratchError::OutOfMemory => "backing heap allocation failed",
    })
  }
}

/// Monotonic bump allocator over one backing-heap region.
pub struct ScratchHeap<'h> {
  heap: &'h Heap,

  /// Start of the region.
  base: *mut u8,

  /// Next free byte; `base <= head <= tail` always holds.
  head: *mut u8,

  /// One past the end of the region.
  tail: *mut u8,
}

impl<'h> ScratchHeap<'h> {
  /// Builds a scratch heap of `size` bytes aligned to `align`.
  pub fn new(
    heap: &'h Heap,
    size: usize,
    align: usize,
  ) -> Result<Self, ScratchError> {
    if size == 0 {
      return Err(ScratchError::BadSize);
    }

    if align == 0 || !align.is_power_of_two() {
      return Err(ScratchError::BadAlignment);
    }

    let base = unsafe { heap.alloc_aligned(size, align) };
    if base.is_null() {
      return Err(ScratchError::OutOfMemory);
    }

    Ok(Self {
      heap,
      base,
      head: base,
      tail: unsafe { base.add(size) },
    })
  }

  /// Bytes consumed since construction or the last reset, alignment
  /// padding included.
  pub fn used(&self) -> usize {
    unsafe { self.head.offset_from(self.base) as usize }
  }

  /// Bytes left before the region is exhausted.
  pub fn remaining(&self) -> usize {
    unsafe { self.tail.offset_from(self.head) as usize }
  }

  /// Bumps out `size` bytes aligned to `align`.
  ///
  /// Returns null, leaving the heap unchanged, when `size` is 0, `align`
  /// is not a non-zero power of two, or the advance would run past the end
  /// of the region.
  ///
  /// # Safety
  ///
  /// The returned pointer is valid for `size` bytes until the next
  /// [`ScratchHeap::reset`]; the caller must not use it afterwards.
  pub unsafe fn alloc(
    &mut self,
    size: usize,
    align: usize,
  ) -> *mut u8 {
    if size == 0 || align == 0 || !align.is_power_of_two() {
      return ptr::null_mut();
    }

    let aligned = align_to!(self.head as usize, align);

    let Some(end) = aligned.checked_add(size) else {
      return ptr::null_mut();
    };

    if end > self.tail as usize {
      return ptr::null_mut();
    }

    self.head = end as *mut u8;

    aligned as *mut u8
  }

  /// Rewinds the bump pointer to the start of the region. Every pointer
  /// previously handed out becomes dead.
  pub fn reset(&mut self) {
    self.head = self.base;
  }
}

impl Drop for ScratchHeap<'_> {
  fn drop(&mut self) {
    unsafe {
      self.heap.free_aligned(self.base);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::heap::HeapFlags;

  fn backing() -> Heap {
    Heap::new(HeapFlags::COUNT)
  }

  #[test]
  fn init_rejects_degenerate_shapes() {
    let heap = backing();

    assert_eq!(
      Err(ScratchError::BadSize),
      ScratchHeap::new(&heap, 0, 16).map(|_| ())
    );
    assert_eq!(
      Err(ScratchError::BadAlignment),
      ScratchHeap::new(&heap, 256, 0).map(|_| ())
    );
    assert_eq!(
      Err(ScratchError::BadAlignment),
      ScratchHeap::new(&heap, 256, 3).map(|_| ())
    );
  }

  #[test]
  fn allocations_are_monotonic_and_aligned() {
    let heap = backing();
    let mut scratch = ScratchHeap::new(&heap, 1024, 64).unwrap();

    unsafe {
      let mut previous_end = scratch.base as usize;

      for (size, align) in [(3usize, 1usize), (40, 8), (1, 32), (100, 4), (7, 16)] {
        let p = scratch.alloc(size, align);

        assert!(!p.is_null());
        assert_eq!(0, p as usize % align);
        assert!(p as usize >= previous_end);

        previous_end = p as usize + size;
      }

      assert_eq!(previous_end - scratch.base as usize, scratch.used());
    }
  }

  #[test]
  fn exhaustion_returns_null_and_changes_nothing() {
    let heap = backing();
    let mut scratch = ScratchHeap::new(&heap, 128, 16).unwrap();

    unsafe {
      assert!(!scratch.alloc(100, 8).is_null());

      let used = scratch.used();

      assert!(scratch.alloc(100, 8).is_null());
      assert_eq!(used, scratch.used());

      // The remainder is still grantable.
      assert!(!scratch.alloc(scratch.remaining(), 1).is_null());
      assert_eq!(0, scratch.remaining());
    }
  }

  #[test]
  fn zero_size_and_bad_alignment_return_null() {
    let heap = backing();
    let mut scratch = ScratchHeap::new(&heap, 128, 16).unwrap();

    unsafe {
      assert!(scratch.alloc(0, 8).is_null());
      assert!(scratch.alloc(16, 0).is_null());
      assert!(scratch.alloc(16, 6).is_null());
    }

    assert_eq!(0, scratch.used());
  }

  #[test]
  fn reset_replays_identical_offsets() {
    let heap = backing();
    let mut scratch = ScratchHeap::new(&heap, 512, 32).unwrap();

    let sequence = [(8usize, 8usize), (33, 16), (5, 1), (64, 32)];

    unsafe {
      let first: Vec<usize> = sequence
        .iter()
        .map(|&(size, align)| scratch.alloc(size, align) as usize)
        .collect();

      scratch.reset();
      assert_eq!(0, scratch.used());

      let second: Vec<usize> = sequence
        .iter()
        .map(|&(size, align)| scratch.alloc(size, align) as usize)
        .collect();

      assert_eq!(first, second);
    }
  }
}
