use std::io::Read;

use ballocator::{BuddyHeap, Heap, HeapFlags, MIN_ORDER};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how the freelists evolve.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints one line per order index: block size and free-block count.
fn print_free_census(buddy: &BuddyHeap) {
  println!("free blocks by order index ({} bytes free in total):", buddy.free_bytes());

  for index in 0..=(buddy.order() - MIN_ORDER) {
    let bytes = 1usize << (buddy.order() - index);
    println!("  index {index:2} ({bytes:5} B): {}", buddy.free_blocks(index));
  }
}

fn main() {
  // Route the backing heap's DEBUG traces to stdout.
  ballocator::logging::init();

  // COUNT + DEBUG: every operation is traced, and tearing the heap down
  // with live allocations panics.
  let heap = Heap::new(HeapFlags::COUNT | HeapFlags::DEBUG);

  // A 4 KiB arena (order 12) handing out 16-byte-aligned pointers.
  let mut buddy = BuddyHeap::new(&heap, 12, 16).expect("buddy heap init failed");

  // --------------------------------------------------------------------
  // 1) Initial state: the whole arena is one free block at order index 0.
  // --------------------------------------------------------------------
  println!("\n[1] Fresh heap");
  print_free_census(&buddy);
  block_until_enter_pressed();

  unsafe {
    // ------------------------------------------------------------------
    // 2) Allocate 200 bytes. Watch the arena split: one block leaves at
    //    the matching order, and a trail of free halves stays behind.
    // ------------------------------------------------------------------
    let first = buddy.alloc(200);
    println!("\n[2] alloc(200) = {first:?}");
    print_free_census(&buddy);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 3) Allocate 200 more. The free half from step 2 is reused, so no
    //    further splitting of large blocks is needed.
    // ------------------------------------------------------------------
    let second = buddy.alloc(200);
    println!("\n[3] alloc(200) = {second:?}");
    print_free_census(&buddy);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 4) Write through both pointers to show the memory is usable.
    // ------------------------------------------------------------------
    first.write_bytes(0xAB, 200);
    second.write_bytes(0xCD, 200);
    println!("\n[4] first[0] = {:#04X}, second[0] = {:#04X}", first.read(), second.read());
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 5) Free the first block. Its buddy is still live, so nothing
    //    coalesces yet.
    // ------------------------------------------------------------------
    buddy.free(first);
    println!("\n[5] free(first)");
    print_free_census(&buddy);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 6) Free the second block. Now every split unwinds: the buddies
    //    merge step by step until the whole arena is one block again.
    // ------------------------------------------------------------------
    buddy.free(second);
    println!("\n[6] free(second) - fully coalesced again");
    print_free_census(&buddy);
    block_until_enter_pressed();

    // ------------------------------------------------------------------
    // 7) Exhaust the arena with minimum-size blocks, then watch an
    //    allocation fail cleanly.
    // ------------------------------------------------------------------
    let mut small = Vec::new();

    loop {
      let p = buddy.alloc(32);
      if p.is_null() {
        break;
      }
      small.push(p);
    }

    println!("\n[7] granted {} small blocks; next alloc returns null", small.len());
    print_free_census(&buddy);

    for p in small {
      buddy.free(p);
    }

    println!("\n    ...and after freeing them all:");
    print_free_census(&buddy);
  }

  // --------------------------------------------------------------------
  // 8) End of demo. Dropping `buddy` returns the arena to the backing
  //    heap; the heap's live count must be back at zero by then.
  // --------------------------------------------------------------------
  println!("\n[8] End of example.");
}
