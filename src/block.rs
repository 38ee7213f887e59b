//! # Block Heap
//!
//! A fixed-size cell allocator: one backing-heap allocation carved into up
//! to 255 equal cells, with O(1) alloc and free.
//!
//! The freelist is threaded through the free cells themselves: each free
//! cell stores the 1-byte index of the next free cell in its first byte, so
//! the allocator needs no metadata beyond a head index and a counter:
//!
//! ```text
//!   head = 2                     (cell indices, not addresses)
//!            ┌─────────────────────────┐
//!            ▼                         │
//!   ┌──────┬──────┬──────┬──────┬──────┬──────┐
//!   │ cell │ cell │ [4]  │ cell │ [5]  │ [6]  │   [n] = next-free index
//!   │ used │ used │ free │ used │ free │ free │   6 = end of chain
//!   └──────┴──────┴──────┴──────┴──────┴──────┘
//!      0      1      2      3      4      5
//! ```

use std::fmt;
use std::ptr;

use crate::heap::Heap;

/// Reasons a [`BlockHeap`] cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
  /// The cell size is zero.
  BadBlockSize,
  /// The cell count is zero.
  BadCount,
  /// The backing heap could not supply the cell array.
  OutOfMemory,
}

impl fmt::Display for BlockError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(match self {
      BlockError::BadBlockSize => "cell size must be non-zero",
      BlockError::BadCount => "cell count must be non-zero",
      BlockError::OutOfMemory => "backing heap allocation failed",
    })
  }
}

/// Fixed-size cell allocator over one backing-heap allocation.
pub struct BlockHeap<'h> {
  heap: &'h Heap,

  /// Start of the cell array.
  base: *mut u8,

  /// Bytes per cell.
  block_size: usize,

  /// Configured number of cells; also the end-of-chain sentinel.
  count: u8,

  /// Index of the first free cell, `count` when none remain.
  head: u8,

  /// Free cells remaining; always `count` minus the live cells.
  nblocks: u8,
}

impl<'h> BlockHeap<'h> {
  /// Builds a block heap of `count` cells of `block_size` bytes each.
  ///
  /// # Errors
  ///
  /// Rejects a zero cell size or count; reports
  /// [`BlockError::OutOfMemory`] when the backing heap refuses the cell
  /// array.
  pub fn new(
    heap: &'h Heap,
    block_size: usize,
    count: u8,
  ) -> Result<Self, BlockError> {
    if block_size == 0 {
      return Err(BlockError::BadBlockSize);
    }

    if count == 0 {
      return Err(BlockError::BadCount);
    }

    let Some(total) = block_size.checked_mul(count as usize) else {
      return Err(BlockError::OutOfMemory);
    };

    let base = unsafe { heap.alloc(total) };
    if base.is_null() {
      return Err(BlockError::OutOfMemory);
    }

    // Thread the freelist through the cells: cell i links to i + 1, the
    // last cell links to the `count` sentinel.
    for index in 0..count {
      unsafe {
        *base.add(index as usize * block_size) = index + 1;
      }
    }

    Ok(Self {
      heap,
      base,
      block_size,
      count,
      head: 0,
      nblocks: count,
    })
  }

  /// Free cells remaining.
  pub fn remaining(&self) -> usize {
    self.nblocks as usize
  }

  /// Pops the head cell off the freelist. Returns null when every cell is
  /// live.
  ///
  /// # Safety
  ///
  /// The returned pointer is valid for `block_size` bytes until passed to
  /// [`BlockHeap::free`]; the caller must not free it twice.
  pub unsafe fn alloc(&mut self) -> *mut u8 {
    if self.nblocks == 0 {
      return ptr::null_mut();
    }

    let cell = unsafe { self.base.add(self.head as usize * self.block_size) };

    self.head = unsafe { *cell };
    self.nblocks -= 1;

    cell
  }

  /// Pushes a cell back onto the freelist. Null is a no-op.
  ///
  /// A pointer outside the cell array or off the cell stride is rejected:
  /// it trips a `debug_assert!` in debug builds and is ignored in release
  /// builds.
  ///
  /// # Safety
  ///
  /// `address` must come from [`BlockHeap::alloc`] on this heap and must
  /// not be used afterwards.
  pub unsafe fn free(
    &mut self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    let offset = (address as usize).wrapping_sub(self.base as usize);

    let in_range = offset < self.count as usize * self.block_size;
    let on_stride = in_range && offset % self.block_size == 0;

    if !on_stride {
      debug_assert!(false, "freed pointer {:?} is not one of our cells", address);
      return;
    }

    unsafe {
      *address = self.head;
    }

    self.head = (offset / self.block_size) as u8;
    self.nblocks += 1;
  }
}

impl Drop for BlockHeap<'_> {
  fn drop(&mut self) {
    unsafe {
      self.heap.free(self.base);
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
      Err(BlockError::BadBlockSize),
      BlockHeap::new(&heap, 0, 8).map(|_| ())
    );
    assert_eq!(
      Err(BlockError::BadCount),
      BlockHeap::new(&heap, 64, 0).map(|_| ())
    );
  }

  #[test]
  fn cells_come_out_in_order_at_the_configured_stride() {
    let heap = backing();
    let mut blocks = BlockHeap::new(&heap, 48, 4).unwrap();

    unsafe {
      for expected in 0..4usize {
        let p = blocks.alloc();

        assert!(!p.is_null());
        assert_eq!(expected * 48, p.offset_from(blocks.base) as usize);
      }

      assert!(blocks.alloc().is_null());
    }
  }

  #[test]
  fn freed_cell_is_reused_first() {
    let heap = backing();
    let mut blocks = BlockHeap::new(&heap, 32, 8).unwrap();

    unsafe {
      let a = blocks.alloc();
      let b = blocks.alloc();

      blocks.free(a);

      // LIFO: the cell freed last is handed out next.
      assert_eq!(a, blocks.alloc());

      blocks.free(b);
      assert_eq!(b, blocks.alloc());

      blocks.free(a);
      blocks.free(b);
    }
  }

  #[test]
  fn capacity_is_restored_after_free() {
    let heap = backing();
    let mut blocks = BlockHeap::new(&heap, 16, 255).unwrap();

    unsafe {
      let mut granted = Vec::new();

      for _ in 0..255 {
        let p = blocks.alloc();
        assert!(!p.is_null());
        granted.push(p);
      }

      assert_eq!(0, blocks.remaining());
      assert!(blocks.alloc().is_null());

      for p in granted.drain(..) {
        blocks.free(p);
      }

      assert_eq!(255, blocks.remaining());

      // The full capacity must be grantable again.
      for _ in 0..255 {
        let p = blocks.alloc();
        assert!(!p.is_null());
        granted.push(p);
      }

      assert!(blocks.alloc().is_null());

      for p in granted {
        blocks.free(p);
      }
    }
  }

  #[test]
  fn cells_do_not_alias() {
    let heap = backing();
    let mut blocks = BlockHeap::new(&heap, 8, 16).unwrap();

    unsafe {
      let mut granted = Vec::new();

      for value in 0..16u64 {
        let p = blocks.alloc() as *mut u64;
        p.write_unaligned(value);
        granted.push(p);
      }

      for (value, p) in granted.iter().enumerate() {
        assert_eq!(value as u64, p.read_unaligned());
      }

      for p in granted {
        blocks.free(p as *mut u8);
      }
    }
  }

  #[test]
  fn free_of_null_is_noop() {
    let heap = backing();
    let mut blocks = BlockHeap::new(&heap, 16, 4).unwrap();

    unsafe {
      blocks.free(std::ptr::null_mut());
    }

    assert_eq!(4, blocks.remaining());
  }

  #[cfg(not(debug_assertions))]
  #[test]
  fn foreign_pointer_is_ignored_in_release() {
    let heap = backing();
    let mut blocks = BlockHeap::new(&heap, 16, 4).unwrap();
    let mut outside = [0u8; 16];

    unsafe {
      blocks.free(outside.as_mut_ptr());

      let inside = blocks.alloc();
      blocks.free(inside.add(3)); // off the stride
    }

    assert_eq!(3, blocks.remaining());
  }
}
