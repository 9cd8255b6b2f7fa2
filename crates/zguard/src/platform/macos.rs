//! Darwin: dedicated arenas are malloc zones.

use core::ffi::c_void;

extern "C" {
    fn malloc_create_zone(start_size: usize, flags: libc::c_uint) -> *mut c_void;
    fn malloc_destroy_zone(zone: *mut c_void);
    fn malloc_default_zone() -> *mut c_void;
    fn malloc_zone_malloc(zone: *mut c_void, size: usize) -> *mut c_void;
    fn malloc_zone_calloc(zone: *mut c_void, num_items: usize, size: usize) -> *mut c_void;
    fn malloc_zone_free(zone: *mut c_void, ptr: *mut c_void);
}

/// # Safety
/// Calls into libmalloc.
pub unsafe fn create_arena() -> *mut c_void {
    malloc_create_zone(0, 0)
}

pub fn default_arena() -> *mut c_void {
    unsafe { malloc_default_zone() }
}

/// Zones have no fragmentation knob.
///
/// # Safety
/// Always safe.
pub unsafe fn set_low_fragmentation(_arena: *mut c_void) -> bool {
    false
}

/// # Safety
/// `arena` must be a zone from `create_arena` with no live blocks.
pub unsafe fn destroy_arena(arena: *mut c_void) {
    malloc_destroy_zone(arena);
}

/// # Safety
/// `arena` must be a live zone.
#[inline]
pub unsafe fn arena_alloc(arena: *mut c_void, size: usize, zeroed: bool) -> *mut u8 {
    if zeroed {
        malloc_zone_calloc(arena, 1, size) as *mut u8
    } else {
        malloc_zone_malloc(arena, size) as *mut u8
    }
}

/// `malloc_zone_free` cannot report failure.
///
/// # Safety
/// `block` must come from `arena_alloc` on `arena`.
#[inline]
pub unsafe fn arena_free(arena: *mut c_void, block: *mut u8) -> bool {
    malloc_zone_free(arena, block as *mut c_void);
    true
}

/// # Safety
/// `block` must be a live block from `arena_alloc`.
#[inline]
pub unsafe fn arena_block_size(_arena: *mut c_void, block: *mut u8) -> Option<usize> {
    match libc::malloc_size(block as *const c_void) {
        0 => None,
        n => Some(n),
    }
}

pub fn fill_random(buf: &mut [u8]) -> bool {
    unsafe { libc::getentropy(buf.as_mut_ptr() as *mut c_void, buf.len()) == 0 }
}

pub fn write_stderr(msg: &[u8]) {
    unsafe {
        libc::write(2, msg.as_ptr() as *const c_void, msg.len());
    }
}

#[cold]
#[inline(never)]
pub fn fail_fast(msg: &[u8]) -> ! {
    write_stderr(msg);
    unsafe { libc::abort() }
}
