//! # Backing Heap
//!
//! A thin wrapper around the OS allocator that every other allocator in this
//! crate draws its arenas from. It hands out raw (`malloc`-shaped) and
//! aligned allocations, optionally zero-fills them, optionally counts them,
//! and optionally traces every operation.
//!
//! ## Aligned allocations
//!
//! The OS allocator only guarantees machine-word alignment, so an aligned
//! request over-allocates and rounds the returned address up. The true
//! (unaligned) pointer is stored immediately before the aligned pointer so
//! that [`Heap::free_aligned`] can recover it:
//!
//! ```text
//!   malloc returns
//!   raw address
//!        │
//!        ▼
//!   ┌────┬──────────────┬───────────────────────────────────────┐
//!   │pad │ raw pointer  │           usable memory               │
//!   │    │ (back-ptr)   │           (size bytes)                │
//!   └────┴──────────────┴───────────────────────────────────────┘
//!                       │
//!                       └── returned pointer (aligned to `align`)
//!
//!   free_aligned(p) reads the back-pointer at p - word_size and
//!   hands it to free(3).
//! ```
//!
//! ## Flags
//!
//! | Flag | Effect |
//! |---|---|
//! | `COUNT` | maintain a live-allocation counter |
//! | `CLEAR` | zero-fill every allocation (`calloc` instead of `malloc`) |
//! | `DEBUG` | emit a `log::debug!` trace line per operation |
//!
//! With `COUNT | DEBUG` both set, dropping the heap while allocations are
//! still live panics on the imbalance.
//!
//! ## Thread Safety
//!
//! A `Heap` is **NOT** thread-safe; the counter is a plain [`Cell`]. Several
//! allocators may share one backing heap within a single thread, which is
//! why the allocation methods take `&self`.

use std::cell::Cell;
use std::{mem, ptr};

use bitflags::bitflags;
use libc::c_void;

use crate::align_to;

bitflags! {
  /// Behaviour flags for a backing [`Heap`], bitwise-combinable.
  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct HeapFlags: u32 {
    /// Maintain a running count of live raw allocations. Combined with
    /// [`HeapFlags::DEBUG`], teardown panics when the count is non-zero.
    const COUNT = 1 << 0;
    /// Zero-fill every allocation.
    const CLEAR = 1 << 1;
    /// Emit a textual trace per operation through the `log` facade.
    const DEBUG = 1 << 2;
  }
}

/// Backing heap over the OS allocator.
///
/// Owns no memory itself; it is an accounting and policy layer. The heap
/// must outlive every allocator built on top of it, which the borrow each
/// allocator holds enforces.
pub struct Heap {
  flags: HeapFlags,

  /// Live raw allocations. Only maintained under [`HeapFlags::COUNT`].
  live: Cell<usize>,
}

impl Heap {
  pub fn new(flags: HeapFlags) -> Self {
    Self {
      flags,
      live: Cell::new(0),
    }
  }

  /// Whether this heap traces operations.
  pub fn debug_enabled(&self) -> bool {
    self.flags.contains(HeapFlags::DEBUG)
  }

  /// Current live-allocation count. Always 0 unless the heap was created
  /// with [`HeapFlags::COUNT`].
  pub fn live_allocations(&self) -> usize {
    self.live.get()
  }

  /// Allocates `size` bytes from the OS with machine-word alignment.
  ///
  /// Returns null when `size` is 0 or the OS refuses the request. The
  /// memory is zero-filled under [`HeapFlags::CLEAR`].
  ///
  /// # Safety
  ///
  /// The returned pointer must be released with [`Heap::free`] on this
  /// heap, exactly once.
  pub unsafe fn alloc(
    &self,
    size: usize,
  ) -> *mut u8 {
    let raw = unsafe { self.raw_alloc(size) };

    if !raw.is_null() && self.debug_enabled() {
      log::debug!(
        "alloc {} bytes at {:?}, {} live",
        size,
        raw,
        self.live.get()
      );
    }

    raw
  }

  /// Releases a pointer obtained from [`Heap::alloc`]. Null is a no-op.
  ///
  /// # Safety
  ///
  /// `address` must come from [`Heap::alloc`] on this heap and must not be
  /// used afterwards.
  pub unsafe fn free(
    &self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    if self.debug_enabled() {
      log::debug!("free {:?}, {} live", address, self.live.get());
    }

    unsafe { self.raw_free(address) };
  }

  /// Allocates `size` bytes aligned to `align` (a non-zero power of two).
  ///
  /// Over-allocates by `align - 1` plus one pointer, stores the true OS
  /// pointer just below the returned address, and returns the first
  /// sufficiently aligned address past that slot. Returns null when `size`
  /// is 0, `align` is invalid, or the OS refuses the request.
  ///
  /// # Safety
  ///
  /// The returned pointer must be released with [`Heap::free_aligned`] on
  /// this heap, exactly once.
  pub unsafe fn alloc_aligned(
    &self,
    size: usize,
    align: usize,
  ) -> *mut u8 {
    if size == 0 || align == 0 || !align.is_power_of_two() {
      return ptr::null_mut();
    }

    let slot = mem::size_of::<*mut u8>();

    let Some(total) = size.checked_add(align - 1 + slot) else {
      return ptr::null_mut();
    };

    let raw = unsafe { self.raw_alloc(total) };
    if raw.is_null() {
      return ptr::null_mut();
    }

    // First aligned address with room for the back-pointer below it.
    let aligned = align_to!(raw as usize + slot, align) as *mut u8;

    unsafe {
      // The slot is only `align`-aligned, which may be less than word
      // alignment.
      (aligned.sub(slot) as *mut *mut u8).write_unaligned(raw);
    }

    if self.debug_enabled() {
      log::debug!(
        "alloc {} bytes aligned to {} at {:?} (raw {:?}), {} live",
        size,
        align,
        aligned,
        raw,
        self.live.get()
      );
    }

    aligned
  }

  /// Releases a pointer obtained from [`Heap::alloc_aligned`]. Null is a
  /// no-op.
  ///
  /// # Safety
  ///
  /// `address` must come from [`Heap::alloc_aligned`] on this heap and must
  /// not be used afterwards.
  pub unsafe fn free_aligned(
    &self,
    address: *mut u8,
  ) {
    if address.is_null() {
      return;
    }

    let slot = mem::size_of::<*mut u8>();
    let raw = unsafe { (address.sub(slot) as *const *mut u8).read_unaligned() };

    if self.debug_enabled() {
      log::debug!(
        "free {:?} (raw {:?}), {} live",
        address,
        raw,
        self.live.get()
      );
    }

    unsafe { self.raw_free(raw) };
  }

  /// Single exit to the OS allocator; applies CLEAR and COUNT.
  unsafe fn raw_alloc(
    &self,
    size: usize,
  ) -> *mut u8 {
    if size == 0 {
      return ptr::null_mut();
    }

    let raw = if self.flags.contains(HeapFlags::CLEAR) {
      unsafe { libc::calloc(1, size) as *mut u8 }
    } else {
      unsafe { libc::malloc(size) as *mut u8 }
    };

    if !raw.is_null() && self.flags.contains(HeapFlags::COUNT) {
      self.live.set(self.live.get() + 1);
    }

    raw
  }

  unsafe fn raw_free(
    &self,
    raw: *mut u8,
  ) {
    if self.flags.contains(HeapFlags::COUNT) {
      self.live.set(self.live.get() - 1);
    }

    unsafe { libc::free(raw as *mut c_void) };
  }
}

impl Drop for Heap {
  fn drop(&mut self) {
    if self.flags.contains(HeapFlags::COUNT | HeapFlags::DEBUG) && self.live.get() != 0 {
      panic!(
        "backing heap torn down with {} live allocation(s)",
        self.live.get()
      );
    }
  }
}
