//! Heap-allocated bitset used as an occupancy histogram.
//!
//! The reconfiguration search hashes every live key into a candidate table and
//! counts distinct indices; a bitset keeps that O(keys) with one allocation
//! reused across all candidates.
//!
//! Bits are stored in `u64` words and padding bits (indices beyond the logical
//! length) always stay zero, so `count` never needs masking.

/// Computes the number of `u64` words needed to store `n` bits.
pub const fn words_for_bits(n: usize) -> usize {
    n.div_ceil(64)
}

/// Growable-by-reset bitset with a runtime length.
///
/// All indexing operations panic when `idx >= bit_length`.
///
/// # Examples
/// ```
/// use typeswitch_rs::stdx::bitset::DynamicBitSet;
///
/// let mut bits = DynamicBitSet::empty(10);
/// assert!(!bits.test_and_set(3));
/// assert!(bits.test_and_set(3));
/// assert_eq!(bits.count(), 1);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicBitSet {
    words: Vec<u64>,
    bit_length: usize,
}

impl DynamicBitSet {
    /// Creates a zeroed bitset with `bit_length` addressable bits.
    pub fn empty(bit_length: usize) -> Self {
        Self {
            words: vec![0u64; words_for_bits(bit_length)],
            bit_length,
        }
    }

    /// Returns the number of addressable bits.
    #[inline]
    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    /// Clears every bit and changes the logical length to `bit_length`.
    ///
    /// Reuses the existing allocation when it is large enough.
    pub fn reset(&mut self, bit_length: usize) {
        let words = words_for_bits(bit_length);
        self.words.clear();
        self.words.resize(words, 0);
        self.bit_length = bit_length;
    }

    /// Counts set bits; never exceeds `bit_length`.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns whether `idx` is set.
    #[inline]
    pub fn is_set(&self, idx: usize) -> bool {
        assert!(idx < self.bit_length, "bit index out of bounds");
        (self.words[idx / 64] & (1u64 << (idx % 64))) != 0
    }

    /// Sets the bit at `idx`.
    #[inline]
    pub fn set(&mut self, idx: usize) {
        assert!(idx < self.bit_length, "bit index out of bounds");
        self.words[idx / 64] |= 1u64 << (idx % 64);
    }

    /// Sets the bit at `idx` and returns its previous value.
    #[inline]
    pub fn test_and_set(&mut self, idx: usize) -> bool {
        assert!(idx < self.bit_length, "bit index out of bounds");
        let word = &mut self.words[idx / 64];
        let mask = 1u64 << (idx % 64);
        let was_set = *word & mask != 0;
        *word |= mask;
        was_set
    }

    /// Returns the heap footprint of the backing words.
    #[inline]
    pub fn memory_bytes(&self) -> usize {
        self.words.capacity() * size_of::<u64>()
    }
}
