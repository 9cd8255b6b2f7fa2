pub mod guarded;
pub mod layout;

pub use guarded::GuardedAllocator;
pub use layout::BlockLayout;
