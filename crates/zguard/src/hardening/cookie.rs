//! Allocation cookies and the per-process tag codec.
//!
//! Every guarded block is laid out as
//!
//! ```text
//! [ header cookie | pad ][ requested bytes ... ][ trailer cookie ]
//! ^ block              ^ user pointer          ^ user + requested
//! ```
//!
//! Each cookie's `tag` is its own address passed through [`encode`]. The
//! header stores the requested size raw. The trailer stores it encoded. A
//! cookie only validates where it was written, and only while nothing has
//! overwritten it.

use crate::hardening::poison;
use crate::platform;
use crate::util::{align_up, ALLOCATION_ALIGNMENT, POISON_WORD};
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationCookie {
    /// `encode(address of this field)`.
    pub tag: usize,
    /// Requested size: raw in the header, encoded in the trailer.
    pub size: usize,
}

pub const COOKIE_SIZE: usize = core::mem::size_of::<AllocationCookie>();

/// Header cookie padded so the user pointer keeps the arena's alignment.
pub const HEADER_SIZE: usize = align_up(COOKIE_SIZE, ALLOCATION_ALIGNMENT);

/// Trailer cookie, written unaligned right after the user bytes.
pub const TRAILER_SIZE: usize = COOKIE_SIZE;

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Process secret; zero means not yet seeded. Conditioned secrets always
/// have the top bit set, so zero is never a valid secret.
static SECRET: AtomicUsize = AtomicUsize::new(0);

const ROTATION_SHIFT: u32 = usize::BITS - 8;
const ALIGN_MASK: usize = ALLOCATION_ALIGNMENT - 1;

#[inline(always)]
const fn rotation(secret: usize) -> u32 {
    ((secret >> ROTATION_SHIFT) as u32) % usize::BITS
}

/// Turn raw entropy into a usable secret.
///
/// The top bit is forced so the secret is never zero. The low bits are
/// chosen so that a word of poison bytes decodes to an address with its
/// lowest bit set. Headers always sit on `ALLOCATION_ALIGNMENT` boundaries,
/// so a poisoned header can never validate.
pub const fn condition(seed: usize) -> usize {
    let seed = seed | (1 << (usize::BITS - 1));
    let poison_low = POISON_WORD.rotate_left(rotation(seed)) & ALIGN_MASK;
    (seed & !ALIGN_MASK) | (poison_low ^ 1)
}

#[inline(always)]
pub const fn encode_with(secret: usize, value: usize) -> usize {
    (value ^ secret).rotate_right(rotation(secret))
}

#[inline(always)]
pub const fn decode_with(secret: usize, tag: usize) -> usize {
    tag.rotate_left(rotation(secret)) ^ secret
}

#[inline(always)]
fn secret() -> usize {
    let s = SECRET.load(Ordering::Relaxed);
    if s != 0 {
        s
    } else {
        seed_secret()
    }
}

/// First use: every racing thread draws a seed, the first to publish wins.
#[cold]
#[inline(never)]
fn seed_secret() -> usize {
    let candidate = condition(platform::random_seed());
    match SECRET.compare_exchange(0, candidate, Ordering::Relaxed, Ordering::Relaxed) {
        Ok(_) => candidate,
        Err(existing) => existing,
    }
}

/// Obfuscate a value with the process secret.
#[inline]
pub fn encode(value: usize) -> usize {
    encode_with(secret(), value)
}

/// Inverse of [`encode`].
#[inline]
pub fn decode(tag: usize) -> usize {
    decode_with(secret(), tag)
}

// ---------------------------------------------------------------------------
// Cookie placement and validation
// ---------------------------------------------------------------------------

/// Write the header cookie at the start of a raw block.
///
/// # Safety
/// `at` must be valid for `HEADER_SIZE` bytes of writes and aligned to
/// `ALLOCATION_ALIGNMENT`.
#[inline]
pub unsafe fn write_header(at: *mut u8, requested: usize) {
    debug_assert!(crate::util::is_aligned(at as usize, ALLOCATION_ALIGNMENT));
    at.cast::<AllocationCookie>().write(AllocationCookie {
        tag: encode(at as usize),
        size: requested,
    });
}

/// Write the trailer cookie directly after the user bytes.
///
/// # Safety
/// `at` must be valid for `TRAILER_SIZE` bytes of writes. No alignment required.
#[inline]
pub unsafe fn write_trailer(at: *mut u8, requested: usize) {
    ptr::write_unaligned(
        at.cast::<AllocationCookie>(),
        AllocationCookie {
            tag: encode(at as usize),
            size: encode(requested),
        },
    );
}

/// Validate a header cookie and return the requested size it records.
///
/// # Safety
/// `at` must be valid for `COOKIE_SIZE` bytes of reads.
#[inline]
pub unsafe fn read_header(at: *const u8) -> Option<usize> {
    let cookie = ptr::read_unaligned(at.cast::<AllocationCookie>());
    if decode(cookie.tag) != at as usize {
        return None;
    }
    Some(cookie.size)
}

/// Validate a trailer cookie against the size recorded in the header.
///
/// # Safety
/// `at` must be valid for `TRAILER_SIZE` bytes of reads.
#[inline]
pub unsafe fn check_trailer(at: *const u8, requested: usize) -> bool {
    let cookie = ptr::read_unaligned(at.cast::<AllocationCookie>());
    decode(cookie.tag) == at as usize && decode(cookie.size) == requested
}

/// Overwrite a validated header so it can never validate again.
///
/// # Safety
/// `at` must be valid for `HEADER_SIZE` bytes of writes.
#[inline]
pub unsafe fn poison_header(at: *mut u8) {
    poison::poison_region(at, HEADER_SIZE);
}

/// Overwrite a validated trailer.
///
/// # Safety
/// `at` must be valid for `TRAILER_SIZE` bytes of writes.
#[inline]
pub unsafe fn poison_trailer(at: *mut u8) {
    poison::poison_region(at, TRAILER_SIZE);
}
