//! Behavior of the exported zlib callbacks, driven through the same function
//! pointers a `z_stream` would hold.

use std::collections::HashSet;
use std::ffi::c_void;
use std::ptr;

use zguard::util::{is_aligned, ALLOCATION_ALIGNMENT};
use zguard::{AllocFunc, FreeFunc, ALLOC_FUNC, FREE_FUNC};

/// The two fields of a `z_stream` this crate cares about.
struct StreamAllocator {
    zalloc: AllocFunc,
    zfree: FreeFunc,
    opaque: *mut c_void,
}

impl StreamAllocator {
    fn new() -> Self {
        StreamAllocator {
            zalloc: ALLOC_FUNC,
            zfree: FREE_FUNC,
            opaque: ptr::null_mut(),
        }
    }

    unsafe fn alloc(&self, items: u32, size: u32) -> *mut u8 {
        (self.zalloc)(self.opaque, items, size) as *mut u8
    }

    unsafe fn free(&self, p: *mut u8) {
        (self.zfree)(self.opaque, p as *mut c_void)
    }
}

// ---------------------------------------------------------------------------
// free(NULL) is a no-op
// ---------------------------------------------------------------------------

#[test]
fn free_null_is_noop() {
    let s = StreamAllocator::new();
    unsafe {
        s.free(ptr::null_mut());
        zguard::zguard_free(ptr::null_mut(), ptr::null_mut());
    }
}

// ---------------------------------------------------------------------------
// Zero-fill follows the single-element convention
// ---------------------------------------------------------------------------

#[test]
fn single_item_is_zero_filled() {
    let s = StreamAllocator::new();
    for size in [1u32, 7, 64, 5000, 65536] {
        unsafe {
            // Dirty the heap first so a recycled block would show garbage.
            let dirty = s.alloc(2, size);
            assert!(!dirty.is_null());
            ptr::write_bytes(dirty, 0xA5, 2 * size as usize);
            s.free(dirty);

            let p = s.alloc(1, size);
            assert!(!p.is_null());
            let bytes = std::slice::from_raw_parts(p, size as usize);
            assert!(bytes.iter().all(|&b| b == 0), "alloc(1, {size}) not zeroed");
            s.free(p);
        }
    }
}

#[test]
fn multi_item_blocks_are_usable() {
    let s = StreamAllocator::new();
    unsafe {
        let p = s.alloc(256, 4);
        assert!(!p.is_null());
        for i in 0..1024 {
            p.add(i).write((i % 251) as u8);
        }
        for i in 0..1024 {
            assert_eq!(p.add(i).read(), (i % 251) as u8);
        }
        s.free(p);
    }
}

// ---------------------------------------------------------------------------
// Alignment and uniqueness
// ---------------------------------------------------------------------------

#[test]
fn pointers_keep_allocation_alignment() {
    let s = StreamAllocator::new();
    let mut ptrs = Vec::new();
    for size in 1..=128u32 {
        let p = unsafe { s.alloc(1, size) };
        assert!(!p.is_null());
        assert!(
            is_aligned(p as usize, ALLOCATION_ALIGNMENT),
            "alloc(1, {size}) = {p:p} not aligned"
        );
        ptrs.push(p);
    }
    for p in ptrs {
        unsafe { s.free(p) };
    }
}

#[test]
fn live_blocks_are_distinct() {
    let s = StreamAllocator::new();
    let ptrs: Vec<*mut u8> = (0..64).map(|_| unsafe { s.alloc(3, 11) }).collect();
    let unique: HashSet<usize> = ptrs.iter().map(|p| *p as usize).collect();
    assert_eq!(unique.len(), ptrs.len());
    for p in ptrs {
        unsafe { s.free(p) };
    }
}

#[test]
fn zero_sized_request_is_freeable() {
    let s = StreamAllocator::new();
    unsafe {
        let a = s.alloc(0, 100);
        let b = s.alloc(100, 0);
        assert!(!a.is_null());
        assert!(!b.is_null());
        assert_ne!(a, b);
        s.free(a);
        s.free(b);
    }
}

// ---------------------------------------------------------------------------
// Writes up to the last requested byte are legal
// ---------------------------------------------------------------------------

#[test]
fn filling_every_requested_byte_frees_cleanly() {
    let s = StreamAllocator::new();
    for (items, size) in [(1u32, 1u32), (3, 5), (17, 13), (1, 4095), (64, 1024)] {
        unsafe {
            let p = s.alloc(items, size);
            assert!(!p.is_null());
            ptr::write_bytes(p, 0xFF, (items * size) as usize);
            s.free(p);
        }
    }
}

// ---------------------------------------------------------------------------
// Oversized requests fail softly
// ---------------------------------------------------------------------------

#[test]
fn overflowing_request_returns_null() {
    let alloc = zguard::api::allocator();
    assert!(alloc.allocate(usize::MAX, 2).is_null());
    assert!(alloc.allocate(2, usize::MAX).is_null());
    assert!(alloc.allocate(1, usize::MAX).is_null());
}

#[test]
fn huge_request_returns_null() {
    // Fits in usize but no heap will satisfy it.
    let alloc = zguard::api::allocator();
    assert!(alloc.allocate(1, usize::MAX / 2).is_null());
}

// ---------------------------------------------------------------------------
// One arena per process
// ---------------------------------------------------------------------------

#[test]
fn arena_is_published_once() {
    let s = StreamAllocator::new();
    unsafe {
        let p = s.alloc(1, 8);
        s.free(p);
    }
    let heap = zguard::api::allocator().heap();
    let first = heap.published().expect("arena published after first allocation");
    assert_eq!(heap.get_arena(), first);
    unsafe {
        let p = s.alloc(4, 8);
        s.free(p);
    }
    assert_eq!(heap.published(), Some(first));
}
