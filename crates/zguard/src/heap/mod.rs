//! Lazily published, process-wide arena.
//!
//! Many threads may hit [`HeapProvider::get_arena`] for the first time at
//! once. Each builds a candidate arena, exactly one candidate is committed
//! with a single compare-exchange, and every loser tears its candidate down
//! and adopts the winner. Afterwards the handle is a single acquire load.

pub mod source;

pub use source::{ArenaHandle, ArenaSource};

use core::ffi::c_void;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

pub struct HeapProvider<S> {
    source: S,
    /// Null until the first arena is published, then never changes.
    published: AtomicPtr<c_void>,
}

/// What a racing initializer built before trying to publish it.
#[derive(Clone, Copy)]
struct Candidate {
    arena: ArenaHandle,
    /// The shared process arena: not ours to destroy.
    fallback: bool,
}

impl<S> HeapProvider<S> {
    pub const fn new(source: S) -> Self {
        HeapProvider {
            source,
            published: AtomicPtr::new(ptr::null_mut()),
        }
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The published arena, if any thread has published one yet.
    #[inline]
    pub fn published(&self) -> Option<ArenaHandle> {
        ArenaHandle::from_raw(self.published.load(Ordering::Acquire))
    }
}

impl<S: ArenaSource> HeapProvider<S> {
    /// Get the process-wide arena, creating and publishing it on first use.
    /// Never fails: when no dedicated arena can be created the platform's
    /// default arena is published instead.
    #[inline]
    pub fn get_arena(&self) -> ArenaHandle {
        match self.published() {
            Some(arena) => arena,
            None => self.publish_slow(),
        }
    }

    #[cold]
    #[inline(never)]
    fn publish_slow(&self) -> ArenaHandle {
        let candidate = self.build_candidate();

        match self.published.compare_exchange(
            ptr::null_mut(),
            candidate.arena.as_ptr(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                crate::platform::note_published(candidate.fallback);
                candidate.arena
            }
            Err(winner) => {
                if !candidate.fallback {
                    // SAFETY: the candidate came from `create` and was never
                    // published, so no block was ever allocated from it.
                    unsafe { self.source.destroy(candidate.arena) };
                }
                // SAFETY: the slot only ever transitions from null to a
                // non-null handle, so a failed exchange observed non-null.
                unsafe { ArenaHandle::from_raw_unchecked(winner) }
            }
        }
    }

    fn build_candidate(&self) -> Candidate {
        match self.source.create() {
            Some(arena) => {
                // Only a performance hint; the arena is usable either way.
                let _ = self.source.enable_low_fragmentation(arena);
                Candidate {
                    arena,
                    fallback: false,
                }
            }
            None => Candidate {
                arena: self.source.process_default(),
                fallback: true,
            },
        }
    }
}
