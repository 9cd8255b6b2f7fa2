use core::ffi::c_void;
use core::ptr::NonNull;

/// Opaque handle to an arena owned by an [`ArenaSource`].
///
/// The handle is only ever interpreted by the source that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ArenaHandle(NonNull<c_void>);

// Arena handles are process-global identifiers; the sources they belong to
// do their own locking.
unsafe impl Send for ArenaHandle {}
unsafe impl Sync for ArenaHandle {}

impl ArenaHandle {
    /// Wrap a raw handle. Returns `None` for null.
    #[inline]
    pub fn from_raw(raw: *mut c_void) -> Option<Self> {
        NonNull::new(raw).map(ArenaHandle)
    }

    /// # Safety
    /// `raw` must be non-null.
    #[inline]
    pub const unsafe fn from_raw_unchecked(raw: *mut c_void) -> Self {
        ArenaHandle(NonNull::new_unchecked(raw))
    }

    #[inline]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// The OS arena primitive a [`HeapProvider`](super::HeapProvider) draws from.
///
/// # Safety
/// Every non-null block returned by [`alloc`](Self::alloc) must be aligned to
/// at least [`ALLOCATION_ALIGNMENT`](crate::util::ALLOCATION_ALIGNMENT) and be
/// valid for reads and writes of the requested size until it is released.
/// `process_default` must return the same shared arena on every call, and that
/// arena must never be passed to `destroy`.
pub unsafe trait ArenaSource {
    /// Create a dedicated growable arena. `None` when the platform can't.
    fn create(&self) -> Option<ArenaHandle>;

    /// The platform's default shared arena.
    fn process_default(&self) -> ArenaHandle;

    /// Best-effort low-fragmentation hint. Returns whether it was applied.
    fn enable_low_fragmentation(&self, arena: ArenaHandle) -> bool;

    /// Tear down a dedicated arena returned by [`create`](Self::create).
    ///
    /// # Safety
    /// `arena` must come from `create` on this source and must have no live blocks.
    unsafe fn destroy(&self, arena: ArenaHandle);

    /// Allocate `size` raw bytes, zero-filled when `zeroed`. Null on failure.
    ///
    /// # Safety
    /// `arena` must be a live arena of this source.
    unsafe fn alloc(&self, arena: ArenaHandle, size: usize, zeroed: bool) -> *mut u8;

    /// Return a block to `arena`. `false` if the arena rejected it.
    ///
    /// # Safety
    /// `block` must have been returned by `alloc` on the same arena and not yet released.
    unsafe fn release(&self, arena: ArenaHandle, block: *mut u8) -> bool;

    /// Usable size of a live block, when the arena can report it.
    ///
    /// # Safety
    /// Same requirements as [`release`](Self::release).
    unsafe fn usable_size(&self, _arena: ArenaHandle, _block: *mut u8) -> Option<usize> {
        None
    }
}

unsafe impl<S: ArenaSource + ?Sized> ArenaSource for &S {
    fn create(&self) -> Option<ArenaHandle> {
        (**self).create()
    }

    fn process_default(&self) -> ArenaHandle {
        (**self).process_default()
    }

    fn enable_low_fragmentation(&self, arena: ArenaHandle) -> bool {
        (**self).enable_low_fragmentation(arena)
    }

    unsafe fn destroy(&self, arena: ArenaHandle) {
        (**self).destroy(arena)
    }

    unsafe fn alloc(&self, arena: ArenaHandle, size: usize, zeroed: bool) -> *mut u8 {
        (**self).alloc(arena, size, zeroed)
    }

    unsafe fn release(&self, arena: ArenaHandle, block: *mut u8) -> bool {
        (**self).release(arena, block)
    }

    unsafe fn usable_size(&self, arena: ArenaHandle, block: *mut u8) -> Option<usize> {
        (**self).usable_size(arena, block)
    }
}
