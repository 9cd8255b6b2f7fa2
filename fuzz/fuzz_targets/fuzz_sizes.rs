#![no_main]

use libfuzzer_sys::fuzz_target;
use zguard::__test_support::{CountingArena, GuardedAllocator};
use zguard::hardening::cookie::{HEADER_SIZE, TRAILER_SIZE};
use zguard::util::ALLOCATION_ALIGNMENT;

// Fuzz target that exercises size arithmetic at the edges.
// Interprets input as (count, element_size) pairs of u64s and checks that
// overflowing requests never reach the arena, while representable sizes
// allocate, fill, and free cleanly.

const MAX_BYTES: usize = 1024 * 1024;

fuzz_target!(|data: &[u8]| {
    let arena = CountingArena::new();
    let alloc = GuardedAllocator::new(&arena);

    for chunk in data.chunks_exact(16) {
        let raw_count = u64::from_le_bytes(chunk[..8].try_into().unwrap()) as usize;
        let raw_size = u64::from_le_bytes(chunk[8..].try_into().unwrap()) as usize;

        let requests_before = arena.alloc_requests();
        let requested = match raw_count
            .checked_mul(raw_size)
            .filter(|n| n.checked_add(HEADER_SIZE + TRAILER_SIZE).is_some())
        {
            None => {
                let ptr = alloc.allocate(raw_count, raw_size);
                assert!(ptr.is_null(), "overflowing request {} x {} succeeded", raw_count, raw_size);
                assert_eq!(arena.alloc_requests(), requests_before, "overflow reached the arena");
                continue;
            }
            // Representable but too large to touch every byte of.
            Some(n) if n > MAX_BYTES => continue,
            Some(n) => n,
        };

        let ptr = alloc.allocate(raw_count, raw_size);
        assert_eq!(arena.alloc_requests(), requests_before + 1);
        if ptr.is_null() {
            continue; // OOM is ok
        }

        assert_eq!((ptr as usize) % ALLOCATION_ALIGNMENT, 0, "unaligned block {:p}", ptr);
        if raw_count == 1 {
            for j in 0..requested {
                assert_eq!(unsafe { *ptr.add(j) }, 0, "single item not zeroed at {}", j);
            }
        }
        unsafe { std::ptr::write_bytes(ptr, 0xBB, requested) };
        unsafe { alloc.free(ptr) };
    }

    assert_eq!(arena.live_blocks(), 0);
    assert!(arena.live_arenas() <= 1);
});
