#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
pub mod unix;
#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios"))))]
pub use unix as sys;

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub mod macos;
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub use macos as sys;

#[cfg(target_os = "windows")]
pub mod windows;
#[cfg(target_os = "windows")]
pub use windows as sys;

use crate::config;
use crate::heap::{ArenaHandle, ArenaSource};

/// The operating system's heap primitives.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemArena;

unsafe impl ArenaSource for SystemArena {
    fn create(&self) -> Option<ArenaHandle> {
        if !config::dedicated_arena() {
            return None;
        }
        ArenaHandle::from_raw(unsafe { sys::create_arena() })
    }

    fn process_default(&self) -> ArenaHandle {
        match ArenaHandle::from_raw(sys::default_arena()) {
            Some(arena) => arena,
            // The process heap outlives every caller; without it nothing works.
            None => fail_fast("zguard: fatal: no process heap\n"),
        }
    }

    fn enable_low_fragmentation(&self, arena: ArenaHandle) -> bool {
        config::low_fragmentation() && unsafe { sys::set_low_fragmentation(arena.as_ptr()) }
    }

    unsafe fn destroy(&self, arena: ArenaHandle) {
        sys::destroy_arena(arena.as_ptr());
    }

    #[inline]
    unsafe fn alloc(&self, arena: ArenaHandle, size: usize, zeroed: bool) -> *mut u8 {
        sys::arena_alloc(arena.as_ptr(), size, zeroed)
    }

    #[inline]
    unsafe fn release(&self, arena: ArenaHandle, block: *mut u8) -> bool {
        sys::arena_free(arena.as_ptr(), block)
    }

    #[inline]
    unsafe fn usable_size(&self, arena: ArenaHandle, block: *mut u8) -> Option<usize> {
        sys::arena_block_size(arena.as_ptr(), block)
    }
}

/// Write raw bytes to stderr. No allocation, no locking, errors ignored.
#[inline]
pub fn write_stderr(msg: &str) {
    sys::write_stderr(msg.as_bytes());
}

/// Terminate immediately with the platform's heap-corruption fault.
/// `msg` is written first where the platform has no fault code of its own.
#[inline(always)]
pub fn fail_fast(msg: &str) -> ! {
    sys::fail_fast(msg.as_bytes())
}

/// One-line notice after the arena is published, when verbose is on.
pub fn note_published(fallback: bool) {
    if !config::verbose() {
        return;
    }
    if fallback {
        write_stderr("zguard: using the process default heap\n");
    } else {
        write_stderr("zguard: using a dedicated heap\n");
    }
}

/// Seed material for the cookie secret: OS entropy where available, mixed
/// with address-space randomization and a counter otherwise.
pub fn random_seed() -> usize {
    let mut bytes = [0u8; core::mem::size_of::<usize>()];
    if sys::fill_random(&mut bytes) {
        return usize::from_ne_bytes(bytes);
    }
    fast_random_u64() as usize
}

/// Get a fast, non-cryptographic random u64.
fn fast_random_u64() -> u64 {
    // Use stack address as a simple entropy source mixed with a counter
    static COUNTER: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
    let stack_addr = &count as *const _ as u64;
    let code_addr = fast_random_u64 as usize as u64;
    let mut x = stack_addr
        .wrapping_mul(0x517cc1b727220a95)
        .wrapping_add(count)
        ^ code_addr.rotate_left(29);
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ceb9fe1a85ec53);
    x ^= x >> 33;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_seeds_differ() {
        // Two identical draws in a row would mean a stuck source.
        let a = random_seed();
        let b = random_seed();
        let c = random_seed();
        assert!(a != b || b != c);
    }

    #[test]
    fn system_arena_round_trip() {
        let source = SystemArena;
        let arena = source.create().unwrap_or_else(|| source.process_default());
        unsafe {
            let block = source.alloc(arena, 100, true);
            assert!(!block.is_null());
            assert!(crate::util::is_aligned(
                block as usize,
                crate::util::ALLOCATION_ALIGNMENT
            ));
            assert!((0..100).all(|i| *block.add(i) == 0));
            if let Some(usable) = source.usable_size(arena, block) {
                assert!(usable >= 100);
            }
            assert!(source.release(arena, block));
            if arena != source.process_default() {
                source.destroy(arena);
            }
        }
    }
}
