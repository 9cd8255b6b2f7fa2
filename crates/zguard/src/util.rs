/// Align `value` up to the next multiple of `align`.
/// `align` must be a power of two.
#[inline(always)]
pub const fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Check if `value` is aligned to `align`.
#[inline(always)]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    value & (align - 1) == 0
}

/// Alignment every arena block is guaranteed to have, and the boundary the
/// header cookie is padded to. Two machine words, like MEMORY_ALLOCATION_ALIGNMENT
/// (8 on 32-bit, 16 on 64-bit).
pub const ALLOCATION_ALIGNMENT: usize = 2 * core::mem::size_of::<usize>();

/// Poison byte written over freed cookies.
pub const POISON_BYTE: u8 = 0xFE;

/// A full machine word of poison bytes.
pub const POISON_WORD: usize = usize::from_ne_bytes([POISON_BYTE; core::mem::size_of::<usize>()]);
