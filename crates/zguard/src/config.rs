//! Environment switches, read once on first use and cached in atomics.
//!
//! Reading happens on the arena-creation path, which may run on many threads
//! at once, so a small state machine makes exactly one thread call `getenv`
//! while the others wait for it. Nothing here allocates.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

const UNINIT: u8 = 0;
const READING: u8 = 1;
const READY: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(UNINIT);

/// Dedicated arenas reserve address space up front; on 32-bit targets the
/// process heap is used unless explicitly overridden.
const DEFAULT_DEDICATED_ARENA: bool = cfg!(target_pointer_width = "64");

static DEDICATED_ARENA: AtomicBool = AtomicBool::new(DEFAULT_DEDICATED_ARENA);
static LOW_FRAGMENTATION: AtomicBool = AtomicBool::new(true);
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Make sure the environment has been read. Cheap after the first call.
#[inline]
pub fn ensure_loaded() {
    if STATE.load(Ordering::Acquire) == READY {
        return;
    }
    load_slow();
}

#[cold]
#[inline(never)]
fn load_slow() {
    match STATE.compare_exchange(UNINIT, READING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {}
        Err(READING) => {
            while STATE.load(Ordering::Acquire) == READING {
                core::hint::spin_loop();
            }
            return;
        }
        Err(_) => return,
    }

    unsafe {
        if let Some(val) = getenv_usize(b"ZGUARD_DEDICATED_ARENA\0") {
            DEDICATED_ARENA.store(val != 0, Ordering::Relaxed);
        }
        if let Some(val) = getenv_usize(b"ZGUARD_LOW_FRAGMENTATION\0") {
            LOW_FRAGMENTATION.store(val != 0, Ordering::Relaxed);
        }
        if let Some(val) = getenv_usize(b"ZGUARD_VERBOSE\0") {
            VERBOSE.store(val != 0, Ordering::Relaxed);
        }
    }

    STATE.store(READY, Ordering::Release);
}

/// Whether the system arena source should try to create a dedicated arena.
pub fn dedicated_arena() -> bool {
    ensure_loaded();
    DEDICATED_ARENA.load(Ordering::Relaxed)
}

/// Whether to request the low-fragmentation hint on a new dedicated arena.
pub fn low_fragmentation() -> bool {
    ensure_loaded();
    LOW_FRAGMENTATION.load(Ordering::Relaxed)
}

/// Whether arena publication is reported on stderr.
pub fn verbose() -> bool {
    ensure_loaded();
    VERBOSE.load(Ordering::Relaxed)
}

/// Parse an environment variable as a usize.
///
/// # Safety
/// Calls libc::getenv. `key` must be NUL-terminated.
unsafe fn getenv_usize(key: &[u8]) -> Option<usize> {
    debug_assert_eq!(key.last(), Some(&0));
    let val = libc::getenv(key.as_ptr() as *const libc::c_char);
    if val.is_null() {
        return None;
    }
    parse_usize(core::ffi::CStr::from_ptr(val).to_bytes())
}

/// Decimal digits only; anything else (including an empty value) is rejected.
fn parse_usize(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    let mut result: usize = 0;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return None;
        }
        result = result.checked_mul(10)?.checked_add((byte - b'0') as usize)?;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimal() {
        assert_eq!(parse_usize(b"0"), Some(0));
        assert_eq!(parse_usize(b"1"), Some(1));
        assert_eq!(parse_usize(b"4096"), Some(4096));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_usize(b""), None);
        assert_eq!(parse_usize(b"yes"), None);
        assert_eq!(parse_usize(b"-1"), None);
        assert_eq!(parse_usize(b"1 "), None);
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse_usize(b"99999999999999999999999999"), None);
    }

    #[test]
    fn loading_is_idempotent() {
        ensure_loaded();
        let first = (dedicated_arena(), low_fragmentation(), verbose());
        ensure_loaded();
        assert_eq!(first, (dedicated_arena(), low_fragmentation(), verbose()));
    }
}
