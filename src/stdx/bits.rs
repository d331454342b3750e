//! Bit-width helpers used to size and score dispatch tables.
//!
//! All functions are pure and operate on `usize` machine words, which is the
//! width of a type-identity value.
//!
//! Invariants:
//! - `bits_required(n)` is the smallest `b` with `n < 2^b`.
//! - `highest_set_bit(0)` is `None`; every other input yields `Some(b)` with
//!   `b < usize::BITS`.

/// Number of bits in a machine word.
pub const WORD_BITS: u32 = usize::BITS;

/// Smallest bit count able to represent every value in `[0, n]`.
///
/// `bits_required(0) == 0`, `bits_required(1) == 1`, `bits_required(4) == 3`.
///
/// # Examples
/// ```
/// use typeswitch_rs::stdx::bits::bits_required;
///
/// assert_eq!(bits_required(3), 2);
/// assert_eq!(bits_required(4), 3);
/// ```
#[inline]
pub const fn bits_required(n: usize) -> u32 {
    WORD_BITS - n.leading_zeros()
}

/// Number of trailing zero bits; `WORD_BITS` for zero.
#[inline]
pub const fn trailing_zero_count(v: usize) -> u32 {
    v.trailing_zeros()
}

/// Number of set bits.
#[inline]
pub const fn population_count(v: usize) -> u32 {
    v.count_ones()
}

/// Position of the most significant set bit, or `None` when `v == 0`.
#[inline]
pub const fn highest_set_bit(v: usize) -> Option<u32> {
    if v == 0 {
        None
    } else {
        Some(WORD_BITS - 1 - v.leading_zeros())
    }
}

/// Mask with the low `bits` bits set. Saturates at a full word.
#[inline]
pub const fn low_mask(bits: u32) -> usize {
    if bits >= WORD_BITS {
        usize::MAX
    } else {
        (1usize << bits) - 1
    }
}

/// Number of index bits that key position `position` contributes when
/// `positions` keys are interleaved into a `log_size`-bit index.
///
/// Interleaving assigns index bit `i` to position `i % positions`, so the low
/// positions receive the extra bit when `log_size` is not a multiple of the
/// arity.
#[inline]
pub const fn interleaved_share(log_size: u32, positions: u32, position: u32) -> u32 {
    debug_assert!(positions > 0);
    debug_assert!(position < positions);
    if log_size <= position {
        0
    } else {
        (log_size - position).div_ceil(positions)
    }
}
