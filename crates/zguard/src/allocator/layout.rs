use crate::hardening::cookie::{HEADER_SIZE, TRAILER_SIZE};

/// Sizes and offsets of one guarded block: header, payload, trailer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLayout {
    /// Bytes the caller asked for.
    pub requested: usize,
    /// Bytes requested from the arena.
    pub total: usize,
}

impl BlockLayout {
    /// Layout for `count` elements of `element_size` bytes.
    /// `None` if either the product or the cookie overhead overflows.
    #[inline]
    pub const fn for_elements(count: usize, element_size: usize) -> Option<Self> {
        match count.checked_mul(element_size) {
            Some(requested) => Self::for_size(requested),
            None => None,
        }
    }

    #[inline]
    pub const fn for_size(requested: usize) -> Option<Self> {
        match requested.checked_add(HEADER_SIZE + TRAILER_SIZE) {
            Some(total) => Some(BlockLayout { requested, total }),
            None => None,
        }
    }

    /// Offset of the user pointer from the block start.
    #[inline(always)]
    pub const fn payload_offset(&self) -> usize {
        HEADER_SIZE
    }

    /// Offset of the trailer cookie from the block start.
    #[inline(always)]
    pub const fn trailer_offset(&self) -> usize {
        HEADER_SIZE + self.requested
    }
}
