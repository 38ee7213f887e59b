//! # ballocator - Composable User-Space Memory Allocators
//!
//! This crate provides three allocation strategies (a **buddy allocator**,
//! a **fixed-size block allocator**, and a **scratch (bump) allocator**)
//! that all draw their arenas from one shared **backing heap** wrapping the
//! OS allocator.
//!
//! ## Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        OS allocator (libc)                       │
//!   └──────────────────────────────┬───────────────────────────────────┘
//!                                  │ malloc / calloc / free
//!   ┌──────────────────────────────▼───────────────────────────────────┐
//!   │  Heap  (raw + aligned alloc, zero-fill, counting, debug traces)  │
//!   └───────┬──────────────────────┬──────────────────────┬────────────┘
//!           │ arena                │ cells                │ region
//!   ┌───────▼────────┐    ┌────────▼───────┐     ┌────────▼───────┐
//!   │   BuddyHeap    │    │   BlockHeap    │     │  ScratchHeap   │
//!   │  2^K arena,    │    │  ≤255 equal    │     │  bump pointer, │
//!   │  split/merge   │    │  cells, O(1)   │     │  bulk reset    │
//!   └────────────────┘    └────────────────┘     └────────────────┘
//! ```
//!
//! The buddy heap is the centrepiece: power-of-two splitting with
//! XOR-buddy coalescing, per-order intrusive freelists, a pair-status
//! bitset that encodes each buddy pair's state in a single toggled bit,
//! and an embedded header that survives arbitrary user alignment. See the
//! buddy module docs for the full picture.
//!
//! ## Crate Structure
//!
//! ```text
//!   ballocator
//!   ├── align      - Alignment macro (align_to!)
//!   ├── math       - ceil_pow2 and De Bruijn log2 (internal)
//!   ├── heap       - Backing Heap and HeapFlags
//!   ├── logging    - Optional stdout logger for debug traces
//!   ├── list       - Intrusive freelist (internal)
//!   ├── buddy      - BuddyHeap implementation
//!   ├── block      - BlockHeap implementation
//!   └── scratch    - ScratchHeap implementation
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ballocator::{BuddyHeap, Heap, HeapFlags};
//!
//! fn main() {
//!     // One backing heap; several allocators may share it.
//!     let heap = Heap::new(HeapFlags::COUNT);
//!
//!     // A 2^20-byte arena handing out 16-byte-aligned pointers.
//!     let mut buddy = BuddyHeap::new(&heap, 20, 16).unwrap();
//!
//!     unsafe {
//!         let ptr = buddy.alloc(200) as *mut u64;
//!
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         buddy.free(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## Lifetimes and Teardown
//!
//! The backing [`Heap`] must outlive every allocator built on top of it;
//! each allocator borrows the heap, so the compiler enforces leaves-first
//! teardown. Dropping an allocator returns its arena to the backing heap;
//! dropping a [`Heap`] created with `COUNT | DEBUG` panics if raw
//! allocations are still live.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives; callers
//!   serialise externally.
//! - **No reallocation**: grow-in-place is not supported by any of the
//!   allocators.
//! - **Bounded requests**: the buddy heap rejects requests above its
//!   configured arena order.
//! - **Unix-oriented**: the backing heap calls the `libc` allocation
//!   family directly.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! All allocation and deallocation operations require `unsafe` blocks.

pub mod align;
mod block;
mod buddy;
mod heap;
mod list;
pub mod logging;
mod math;
mod scratch;

pub use block::{BlockError, BlockHeap};
pub use buddy::{BuddyError, BuddyHeap, MAX_ORDER, MIN_ORDER};
pub use heap::{Heap, HeapFlags};
pub use scratch::{ScratchError, ScratchHeap};
