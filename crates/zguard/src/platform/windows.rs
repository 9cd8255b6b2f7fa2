//! Windows: dedicated arenas are private heaps from `HeapCreate`.

use core::ffi::c_void;
use windows_sys::Win32::System::Memory::{
    GetProcessHeap, HeapAlloc, HeapCompatibilityInformation, HeapCreate, HeapDestroy, HeapFree,
    HeapSetInformation, HeapSize, HEAP_ZERO_MEMORY,
};

/// `HeapCompatibilityInformation` value selecting the low-fragmentation heap.
const LFH: u32 = 2;

/// `FAST_FAIL_HEAP_METADATA_CORRUPTION` from winnt.h.
const FAST_FAIL_HEAP_METADATA_CORRUPTION: u32 = 50;

/// A growable private heap.
///
/// # Safety
/// Calls into kernel32.
pub unsafe fn create_arena() -> *mut c_void {
    HeapCreate(0, 0, 0)
}

pub fn default_arena() -> *mut c_void {
    unsafe { GetProcessHeap() }
}

/// # Safety
/// `arena` must be a live heap handle.
pub unsafe fn set_low_fragmentation(arena: *mut c_void) -> bool {
    HeapSetInformation(
        arena,
        HeapCompatibilityInformation,
        &LFH as *const u32 as *const c_void,
        core::mem::size_of::<u32>(),
    ) != 0
}

/// # Safety
/// `arena` must be a heap from `create_arena`.
pub unsafe fn destroy_arena(arena: *mut c_void) {
    HeapDestroy(arena);
}

/// # Safety
/// `arena` must be a live heap handle.
#[inline]
pub unsafe fn arena_alloc(arena: *mut c_void, size: usize, zeroed: bool) -> *mut u8 {
    let flags = if zeroed { HEAP_ZERO_MEMORY } else { 0 };
    HeapAlloc(arena, flags, size) as *mut u8
}

/// # Safety
/// `block` must come from `arena_alloc` on `arena`.
#[inline]
pub unsafe fn arena_free(arena: *mut c_void, block: *mut u8) -> bool {
    HeapFree(arena, 0, block as *const c_void) != 0
}

/// # Safety
/// `block` must be a live block from `arena_alloc` on `arena`.
#[inline]
pub unsafe fn arena_block_size(arena: *mut c_void, block: *mut u8) -> Option<usize> {
    match HeapSize(arena, 0, block as *const c_void) {
        usize::MAX => None,
        n => Some(n),
    }
}

pub fn fill_random(_buf: &mut [u8]) -> bool {
    false
}

pub fn write_stderr(msg: &[u8]) {
    unsafe {
        libc::write(2, msg.as_ptr() as *const c_void, msg.len() as libc::c_uint);
    }
}

/// `__fastfail(FAST_FAIL_HEAP_METADATA_CORRUPTION)`. Bypasses exception
/// handlers and is reported as its own failure class by WER.
#[cold]
#[inline(never)]
pub fn fail_fast(_msg: &[u8]) -> ! {
    unsafe {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        core::arch::asm!(
            "int 0x29",
            in("ecx") FAST_FAIL_HEAP_METADATA_CORRUPTION,
            options(noreturn, nostack)
        );
        #[cfg(target_arch = "aarch64")]
        core::arch::asm!(
            "brk #0xF003",
            in("x0") FAST_FAIL_HEAP_METADATA_CORRUPTION as u64,
            options(noreturn, nostack)
        );
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
        {
            write_stderr(_msg);
            libc::abort()
        }
    }
}
