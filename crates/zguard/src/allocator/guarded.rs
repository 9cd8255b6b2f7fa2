use crate::allocator::layout::BlockLayout;
use crate::hardening::cookie::{self, HEADER_SIZE};
use crate::hardening::heap_corruption;
use crate::heap::{ArenaSource, HeapProvider};
use core::ptr;

/// Cookie-guarded allocator over a lazily published arena.
///
/// `allocate` brackets every block with a header and a trailer cookie; `free`
/// validates both before handing the block back, and terminates the process
/// if either has been disturbed.
pub struct GuardedAllocator<S> {
    heap: HeapProvider<S>,
}

impl<S> GuardedAllocator<S> {
    pub const fn new(source: S) -> Self {
        GuardedAllocator {
            heap: HeapProvider::new(source),
        }
    }

    #[inline]
    pub fn heap(&self) -> &HeapProvider<S> {
        &self.heap
    }
}

impl<S: ArenaSource> GuardedAllocator<S> {
    /// Allocate `count * element_size` bytes.
    ///
    /// Returns null if the size overflows (without touching the arena) or the
    /// arena is out of memory. A single-element request is zero-filled, the
    /// way zlib asks for one zeroed state structure; any other count leaves
    /// the contents uninitialized.
    pub fn allocate(&self, count: usize, element_size: usize) -> *mut u8 {
        let Some(layout) = BlockLayout::for_elements(count, element_size) else {
            return ptr::null_mut();
        };
        let zeroed = count == 1;

        let arena = self.heap.get_arena();
        // SAFETY: `arena` came from this provider's source.
        let block = unsafe { self.heap.source().alloc(arena, layout.total, zeroed) };
        if block.is_null() {
            return ptr::null_mut();
        }

        // SAFETY: the block is `layout.total` bytes and suitably aligned.
        unsafe {
            cookie::write_header(block, layout.requested);
            cookie::write_trailer(block.add(layout.trailer_offset()), layout.requested);
            block.add(layout.payload_offset())
        }
    }

    /// Validate and release a block returned by [`allocate`](Self::allocate).
    /// Null is a no-op.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer returned by `allocate` on this
    /// allocator. Freeing it twice, or freeing a foreign pointer, is detected
    /// on a best-effort basis and terminates the process.
    pub unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }

        let block = ptr.wrapping_sub(HEADER_SIZE);
        let requested = match cookie::read_header(block) {
            Some(requested) => requested,
            None => heap_corruption(),
        };

        let arena = self.heap.get_arena();
        let source = self.heap.source();

        // A corrupted size would send the trailer read out of the block.
        if let Some(usable) = source.usable_size(arena, block) {
            match BlockLayout::for_size(requested) {
                Some(layout) if layout.total <= usable => {}
                _ => heap_corruption(),
            }
        }

        let trailer = ptr.wrapping_add(requested);
        if !cookie::check_trailer(trailer, requested) {
            heap_corruption();
        }

        cookie::poison_header(block);
        cookie::poison_trailer(trailer);

        if !source.release(arena, block) {
            heap_corruption();
        }
    }
}
