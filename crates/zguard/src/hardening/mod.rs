pub mod cookie;
pub mod poison;

/// Diagnostic written before a fail-fast on platforms without a native
/// fast-fail code. Matched verbatim by the crash-detection tests.
pub const HEAP_CORRUPTION_MESSAGE: &str = "zguard: fatal: heap metadata corruption detected\n";

/// Terminate the process because allocation metadata no longer validates.
///
/// Never returns, never unwinds, never allocates. Kept out of line so it
/// shows up as its own frame in crash reports.
#[cold]
#[inline(never)]
pub fn heap_corruption() -> ! {
    crate::platform::fail_fast(HEAP_CORRUPTION_MESSAGE)
}
