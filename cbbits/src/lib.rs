#![no_std]

//! Integer helpers for working with power-of-two alignments. Shared by the virtual memory
//! provider (page rounding), the arena (allocation alignment) and the dynamic array (capacity
//! rounding).

/// Rounds `num` up to the nearest multiple of `to`, which must be a power of two.
///
/// Overflowing `usize` is a bug in the caller. Use [`checked_align_up`] when `num` comes from
/// untrusted sizes.
#[inline]
pub const fn align_up(num: usize, to: usize) -> usize {
    assert!(to.is_power_of_two(), "Alignment must be a nonzero power of two");

    let mask = to - 1;
    (num + mask) & !mask
}

/// Like [`align_up`], but returns `None` instead of overflowing.
#[inline]
pub const fn checked_align_up(num: usize, to: usize) -> Option<usize> {
    assert!(to.is_power_of_two(), "Alignment must be a nonzero power of two");

    let mask = to - 1;
    match num.checked_add(mask) {
        Some(n) => Some(n & !mask),
        None => None,
    }
}

#[inline]
pub const fn is_aligned(num: usize, to: usize) -> bool {
    assert!(to.is_power_of_two(), "Alignment must be a nonzero power of two");
    num & (to - 1) == 0
}

/// Returns N for `num == 2^N`. Panics if `num` is not a power of two.
#[inline]
pub const fn log2_pow2(num: usize) -> u32 {
    // A power of two has exactly one bit set, so the zeros on both sides of it add up to one less
    // than the bit width.
    assert!(
        num.leading_zeros() + num.trailing_zeros() == usize::BITS - 1,
        "log2_pow2 requires a power of two"
    );

    usize::BITS - num.leading_zeros() - 1
}
