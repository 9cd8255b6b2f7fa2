//! C entry points: the `zalloc` / `zfree` pair a zlib stream is configured with.
//!
//! ```c
//! z_stream strm = {0};
//! strm.zalloc = zguard_alloc;
//! strm.zfree  = zguard_free;
//! deflateInit(&strm, Z_DEFAULT_COMPRESSION);
//! ```

use crate::allocator::GuardedAllocator;
use crate::platform::SystemArena;
use core::ffi::{c_uint, c_void};

static ALLOCATOR: GuardedAllocator<SystemArena> = GuardedAllocator::new(SystemArena);

/// The process-wide allocator behind the C entry points.
#[inline(always)]
pub fn allocator() -> &'static GuardedAllocator<SystemArena> {
    &ALLOCATOR
}

/// zlib's `alloc_func`.
pub type AllocFunc = unsafe extern "C" fn(*mut c_void, c_uint, c_uint) -> *mut c_void;

/// zlib's `free_func`.
pub type FreeFunc = unsafe extern "C" fn(*mut c_void, *mut c_void);

pub const ALLOC_FUNC: AllocFunc = zguard_alloc;
pub const FREE_FUNC: FreeFunc = zguard_free;

// ============================================================================
// zlib allocator callbacks
// ============================================================================

/// Allocate `items * size` bytes; zero-filled when `items == 1`.
/// `opaque` is ignored. Returns null on overflow or out-of-memory.
///
/// # Safety
/// Always safe to call; `unsafe` to match `alloc_func`.
#[no_mangle]
pub unsafe extern "C" fn zguard_alloc(
    _opaque: *mut c_void,
    items: c_uint,
    size: c_uint,
) -> *mut c_void {
    ALLOCATOR.allocate(items as usize, size as usize) as *mut c_void
}

/// Validate and release a block from [`zguard_alloc`]. `opaque` is ignored.
/// Terminates the process if the block's cookies have been disturbed.
///
/// # Safety
/// `address` must be null or a live pointer from `zguard_alloc`.
#[no_mangle]
pub unsafe extern "C" fn zguard_free(_opaque: *mut c_void, address: *mut c_void) {
    ALLOCATOR.free(address as *mut u8);
}

// ============================================================================
// zutil.c hook names, for zlib builds that call zcalloc/zcfree directly
// ============================================================================

/// # Safety
/// See [`zguard_alloc`].
#[cfg(feature = "zlib-symbols")]
#[no_mangle]
pub unsafe extern "C" fn zcalloc(opaque: *mut c_void, items: c_uint, size: c_uint) -> *mut c_void {
    zguard_alloc(opaque, items, size)
}

/// # Safety
/// See [`zguard_free`].
#[cfg(feature = "zlib-symbols")]
#[no_mangle]
pub unsafe extern "C" fn zcfree(opaque: *mut c_void, ptr: *mut c_void) {
    zguard_free(opaque, ptr)
}
