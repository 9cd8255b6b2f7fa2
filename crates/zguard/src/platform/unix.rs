//! Linux and other Unix targets.
//!
//! The C library offers no private-heap primitive here, so dedicated arena
//! creation always reports failure and the process heap is used.

use core::ffi::c_void;
use core::ptr;

/// Stands in for "the process heap" so it has a stable non-null handle.
static PROCESS_HEAP: u8 = 0;

/// No private heaps on this platform.
///
/// # Safety
/// Always safe; kept `unsafe` to match the other platforms.
pub unsafe fn create_arena() -> *mut c_void {
    ptr::null_mut()
}

/// The process heap.
///
/// On glibc this also stops blocks up to `MMAP_THRESHOLD_MAX` from getting a
/// mapping of their own, so a freed block's poisoned cookies stay readable
/// and a second `free` of it is caught instead of faulting on unmapped
/// memory.
pub fn default_arena() -> *mut c_void {
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    retain_mapped_blocks();
    ptr::addr_of!(PROCESS_HEAP) as *mut c_void
}

/// glibc's ceiling for `M_MMAP_THRESHOLD`: 32 MiB on 64-bit, 512 KiB on 32-bit.
/// Larger values are rejected, so bigger blocks are still mapped on their own.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
pub const MMAP_THRESHOLD_MAX: usize = if cfg!(target_pointer_width = "64") {
    4 * 1024 * 1024 * core::mem::size_of::<libc::c_long>()
} else {
    512 * 1024
};

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn retain_mapped_blocks() {
    // Runs on every creator before it publishes, so no block is allocated
    // under the old threshold.
    unsafe {
        libc::mallopt(libc::M_MMAP_THRESHOLD, MMAP_THRESHOLD_MAX as libc::c_int);
    }
}

/// # Safety
/// Never called with a dedicated arena on this platform.
pub unsafe fn set_low_fragmentation(_arena: *mut c_void) -> bool {
    false
}

/// # Safety
/// Never called on this platform: `create_arena` never succeeds.
pub unsafe fn destroy_arena(_arena: *mut c_void) {}

/// Allocate from the process heap. `calloc(1, n)` when zeroing so large
/// blocks can come straight from fresh zero pages.
///
/// # Safety
/// `_arena` must be the process heap handle.
#[inline]
pub unsafe fn arena_alloc(_arena: *mut c_void, size: usize, zeroed: bool) -> *mut u8 {
    if zeroed {
        libc::calloc(1, size) as *mut u8
    } else {
        libc::malloc(size) as *mut u8
    }
}

/// `free` cannot report failure.
///
/// # Safety
/// `block` must come from `arena_alloc` and not be freed yet.
#[inline]
pub unsafe fn arena_free(_arena: *mut c_void, block: *mut u8) -> bool {
    libc::free(block as *mut c_void);
    true
}

/// # Safety
/// `block` must be a live block from `arena_alloc`.
#[cfg(any(target_os = "linux", target_os = "android"))]
#[inline]
pub unsafe fn arena_block_size(_arena: *mut c_void, block: *mut u8) -> Option<usize> {
    Some(libc::malloc_usable_size(block as *mut c_void))
}

/// # Safety
/// `block` must be a live block from `arena_alloc`.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
#[inline]
pub unsafe fn arena_block_size(_arena: *mut c_void, _block: *mut u8) -> Option<usize> {
    None
}

/// Fill `buf` from getrandom(2). Returns false if the kernel refused.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn fill_random(buf: &mut [u8]) -> bool {
    let ret = unsafe {
        libc::getrandom(
            buf.as_mut_ptr() as *mut c_void,
            buf.len(),
            libc::GRND_NONBLOCK,
        )
    };
    ret == buf.len() as isize
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn fill_random(_buf: &mut [u8]) -> bool {
    false
}

pub fn write_stderr(msg: &[u8]) {
    unsafe {
        libc::write(2, msg.as_ptr() as *const c_void, msg.len());
    }
}

/// Print the diagnostic and raise SIGABRT. `abort` does not run atexit
/// handlers or unwind, and cannot be caught and resumed.
#[cold]
#[inline(never)]
pub fn fail_fast(msg: &[u8]) -> ! {
    write_stderr(msg);
    unsafe { libc::abort() }
}
