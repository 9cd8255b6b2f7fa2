//! Cookie-guarded allocation callbacks for zlib-style compression libraries.
//!
//! Every block handed out by [`GuardedAllocator`] is bracketed by a header
//! and a trailer cookie whose tags are their own addresses, obfuscated with a
//! per-process secret. Releasing a block validates both cookies; any mismatch
//! (overrun, stale pointer, double free) terminates the process through a
//! dedicated heap-corruption fault rather than returning an error.
//!
//! Blocks come from a single process-wide arena which [`heap::HeapProvider`]
//! creates on first use and publishes exactly once, however many threads
//! race on it.
//!
//! The [`api`] module exports the allocator as a pair of C callbacks shaped
//! like zlib's `alloc_func` / `free_func`.

extern crate libc;

pub mod allocator;
pub mod api;
pub mod config;
pub mod hardening;
pub mod heap;
pub mod platform;
pub mod util;

#[doc(hidden)]
pub mod __test_support;

pub use allocator::GuardedAllocator;
pub use api::{zguard_alloc, zguard_free, AllocFunc, FreeFunc, ALLOC_FUNC, FREE_FUNC};
pub use heap::{ArenaHandle, ArenaSource, HeapProvider};
pub use platform::SystemArena;
