//! Instrumented arena source for tests and fuzzing. Not part of the stable API.
//!
//! Blocks come from the C heap with a two-word prefix recording the block's
//! size and owning arena, so `usable_size` is exact and `release` can reject
//! blocks handed to the wrong arena.

use crate::heap::{ArenaHandle, ArenaSource};
use crate::util::ALLOCATION_ALIGNMENT;
use core::ffi::c_void;
use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub use crate::allocator::GuardedAllocator;
pub use crate::heap::HeapProvider;

/// Byte non-zeroed blocks are filled with, so missing zero-fill is visible.
pub const JUNK_BYTE: u8 = 0xCD;

const PREFIX: usize = ALLOCATION_ALIGNMENT;

#[repr(C)]
struct Prefix {
    size: usize,
    arena: usize,
}

const _: () = assert!(core::mem::size_of::<Prefix>() <= PREFIX);

/// Marker allocation whose address serves as an arena handle.
#[repr(align(16))]
struct ArenaToken(#[allow(dead_code)] u8);

pub struct CountingArena {
    default_arena: Box<ArenaToken>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    low_fragmentation: AtomicUsize,
    alloc_requests: AtomicUsize,
    zeroed_requests: AtomicUsize,
    releases: AtomicUsize,
    live_blocks: AtomicUsize,
    fail_create: AtomicBool,
    fail_low_fragmentation: AtomicBool,
    fail_alloc: AtomicBool,
    fail_release: AtomicBool,
    retain_released: AtomicBool,
    create_delay_us: AtomicUsize,
}

impl Default for CountingArena {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingArena {
    pub fn new() -> Self {
        CountingArena {
            default_arena: Box::new(ArenaToken(0)),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            low_fragmentation: AtomicUsize::new(0),
            alloc_requests: AtomicUsize::new(0),
            zeroed_requests: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            live_blocks: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            fail_low_fragmentation: AtomicBool::new(false),
            fail_alloc: AtomicBool::new(false),
            fail_release: AtomicBool::new(false),
            retain_released: AtomicBool::new(false),
            create_delay_us: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Dedicated arenas created and not yet destroyed.
    pub fn live_arenas(&self) -> usize {
        self.created() - self.destroyed()
    }

    pub fn low_fragmentation_requests(&self) -> usize {
        self.low_fragmentation.load(Ordering::SeqCst)
    }

    pub fn alloc_requests(&self) -> usize {
        self.alloc_requests.load(Ordering::SeqCst)
    }

    pub fn zeroed_requests(&self) -> usize {
        self.zeroed_requests.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn live_blocks(&self) -> usize {
        self.live_blocks.load(Ordering::SeqCst)
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_low_fragmentation(&self, fail: bool) {
        self.fail_low_fragmentation.store(fail, Ordering::SeqCst);
    }

    pub fn fail_alloc(&self, fail: bool) {
        self.fail_alloc.store(fail, Ordering::SeqCst);
    }

    pub fn fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Leak released blocks instead of freeing them, so their final
    /// contents can be inspected after `free`.
    pub fn retain_released(&self, retain: bool) {
        self.retain_released.store(retain, Ordering::SeqCst);
    }

    /// Stall every `create` call, widening the first-use race window.
    pub fn set_create_delay(&self, delay: Duration) {
        self.create_delay_us
            .store(delay.as_micros() as usize, Ordering::SeqCst);
    }
}

unsafe impl ArenaSource for CountingArena {
    fn create(&self) -> Option<ArenaHandle> {
        let delay = self.create_delay_us.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_micros(delay as u64));
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return None;
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let token = Box::into_raw(Box::new(ArenaToken(0)));
        ArenaHandle::from_raw(token as *mut c_void)
    }

    fn process_default(&self) -> ArenaHandle {
        let token: *const ArenaToken = &*self.default_arena;
        // SAFETY: points into a live Box.
        unsafe { ArenaHandle::from_raw_unchecked(token as *mut c_void) }
    }

    fn enable_low_fragmentation(&self, _arena: ArenaHandle) -> bool {
        self.low_fragmentation.fetch_add(1, Ordering::SeqCst);
        !self.fail_low_fragmentation.load(Ordering::SeqCst)
    }

    unsafe fn destroy(&self, arena: ArenaHandle) {
        assert_ne!(arena, self.process_default(), "destroyed the shared arena");
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        drop(Box::from_raw(arena.as_ptr() as *mut ArenaToken));
    }

    unsafe fn alloc(&self, arena: ArenaHandle, size: usize, zeroed: bool) -> *mut u8 {
        self.alloc_requests.fetch_add(1, Ordering::SeqCst);
        if zeroed {
            self.zeroed_requests.fetch_add(1, Ordering::SeqCst);
        }
        if self.fail_alloc.load(Ordering::SeqCst) {
            return ptr::null_mut();
        }
        let Some(total) = size.checked_add(PREFIX) else {
            return ptr::null_mut();
        };
        let raw = libc::malloc(total) as *mut u8;
        if raw.is_null() {
            return ptr::null_mut();
        }
        debug_assert!(crate::util::is_aligned(raw as usize, ALLOCATION_ALIGNMENT));
        raw.cast::<Prefix>().write(Prefix {
            size,
            arena: arena.as_ptr() as usize,
        });
        let block = raw.add(PREFIX);
        ptr::write_bytes(block, if zeroed { 0 } else { JUNK_BYTE }, size);
        self.live_blocks.fetch_add(1, Ordering::SeqCst);
        block
    }

    unsafe fn release(&self, arena: ArenaHandle, block: *mut u8) -> bool {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release.load(Ordering::SeqCst) {
            return false;
        }
        let raw = block.sub(PREFIX);
        if raw.cast::<Prefix>().read().arena != arena.as_ptr() as usize {
            return false;
        }
        if !self.retain_released.load(Ordering::SeqCst) {
            libc::free(raw as *mut c_void);
        }
        self.live_blocks.fetch_sub(1, Ordering::SeqCst);
        true
    }

    unsafe fn usable_size(&self, _arena: ArenaHandle, block: *mut u8) -> Option<usize> {
        Some(block.sub(PREFIX).cast::<Prefix>().read().size)
    }
}
