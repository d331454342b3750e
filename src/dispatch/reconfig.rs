//! Layout search run when a dispatch table is full or colliding too often.
//!
//! Purpose: pick `(log_size, shifts)` for the current key set so that as many
//! keys as possible get distinct home indices, without ever shrinking the
//! table.
//!
//! Algorithm:
//! 1. Per key position, OR together `key[i] ^ first[i]` over all keys. Bits
//!    outside that mask never vary and cannot separate keys; its trailing zero
//!    count is the smallest useful shift.
//! 2. Candidate sizes run from the smallest size holding every key (never
//!    below the current size) up to `max_log_inc` steps above it.
//! 3. For each size, position `i` contributes `b_i` interleaved index bits, so
//!    useful shifts run from `tz(diff[i])` up to `hsb(diff[i]) + 1 - b_i`.
//!    Each range is clipped so the whole product stays within
//!    `max_candidates`.
//! 4. Every candidate hashes all keys into a bitset histogram; the score is
//!    the number of distinct indices. The current layout (when large enough)
//!    is scored first and wins ties. The search stops at the first candidate
//!    with no collisions.
//!
//! Search exhaustion is not an error: the best candidate seen is returned.

use std::ops::RangeInclusive;

use super::descriptor::TableLayout;
use crate::api::{DispatchKey, Tuning};
use crate::stdx::bits::{bits_required, highest_set_bit, interleaved_share, trailing_zero_count};
use crate::stdx::bitset::DynamicBitSet;

/// Bits that vary across a key set, per key position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyDiversity<const N: usize> {
    diff: [usize; N],
}

impl<const N: usize> KeyDiversity<N> {
    /// Computes the per-position XOR-difference masks of `keys`.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a DispatchKey<N>>) -> Self {
        let mut keys = keys.into_iter();
        let mut diff = [0usize; N];
        if let Some(first) = keys.next() {
            for key in keys {
                for (d, (a, b)) in diff.iter_mut().zip(first.words().iter().zip(key.words())) {
                    *d |= a ^ b;
                }
            }
        }
        Self { diff }
    }

    /// Per-position masks of varying bits.
    #[inline]
    pub fn diff(&self) -> &[usize; N] {
        &self.diff
    }

    /// Number of positions where at least one bit varies.
    pub fn varying_positions(&self) -> u32 {
        self.diff.iter().filter(|&&d| d != 0).count() as u32
    }

    /// Varying positions that receive at least one index bit in a
    /// `2^log_size` table. Only these have more than one shift to try.
    pub fn searched_positions(&self, log_size: u32) -> u32 {
        self.diff
            .iter()
            .enumerate()
            .filter(|&(pos, &d)| d != 0 && interleaved_share(log_size, N as u32, pos as u32) > 0)
            .count() as u32
    }

    /// Useful shift amounts for `position` in a `2^log_size` table, at most
    /// `span` of them.
    ///
    /// A position without variation, or one that contributes no index bits at
    /// this size, keeps `current_shift`.
    pub fn shift_range(
        &self,
        position: usize,
        log_size: u32,
        current_shift: u32,
        span: u32,
    ) -> RangeInclusive<u32> {
        debug_assert!(span >= 1);
        let diff = self.diff[position];
        let Some(hsb) = highest_set_bit(diff) else {
            return current_shift..=current_shift;
        };
        let share = interleaved_share(log_size, N as u32, position as u32);
        if share == 0 {
            return current_shift..=current_shift;
        }
        let lo = trailing_zero_count(diff);
        let hi = (hsb + 1)
            .saturating_sub(share)
            .max(lo)
            .min(lo.saturating_add(span - 1));
        lo..=hi
    }
}

/// Best layout found by [`search`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome<const N: usize> {
    /// Chosen layout.
    pub layout: TableLayout<N>,
    /// Distinct home indices among the searched keys under `layout`.
    pub distinct: usize,
    /// Number of keys searched (live keys plus any pending key).
    pub keys: usize,
    /// Candidates scored, including the current layout.
    pub candidates: usize,
}

impl<const N: usize> SearchOutcome<N> {
    /// Keys that share a home index with another key.
    #[inline]
    pub fn collisions(&self) -> usize {
        self.keys - self.distinct
    }

    /// `true` when every key has its own home index.
    #[inline]
    pub fn is_perfect(&self) -> bool {
        self.distinct == self.keys
    }
}

/// Candidate `log_size` values for `count` keys.
///
/// The lower bound is the smallest size holding `count` keys, never below the
/// current size. The upper bound adds `max_log_inc`, clamped by
/// `max_log_size` unless the lower bound already exceeds it.
pub fn log_size_range(count: usize, current: u32, tuning: &Tuning) -> RangeInclusive<u32> {
    let needed = bits_required(count.saturating_sub(1)).max(tuning.min_log_size);
    let lo = current.max(needed);
    let hi = needed
        .saturating_add(tuning.max_log_inc)
        .min(tuning.max_log_size)
        .max(lo);
    lo..=hi
}

/// Largest `s >= 1` with `s^k <= budget`.
fn int_root(budget: usize, k: u32) -> u32 {
    if k == 0 {
        return 1;
    }
    let mut s: u32 = 1;
    while (s as usize + 1)
        .checked_pow(k)
        .is_some_and(|p| p <= budget)
    {
        s += 1;
    }
    s
}

/// Counts distinct home indices of `keys` under `layout`.
pub fn score<const N: usize>(
    layout: &TableLayout<N>,
    keys: &[DispatchKey<N>],
    histogram: &mut DynamicBitSet,
) -> usize {
    histogram.reset(layout.capacity());
    let mut distinct = 0;
    for key in keys {
        if !histogram.test_and_set(layout.index(key)) {
            distinct += 1;
        }
    }
    distinct
}

/// Searches for the layout giving `keys` the fewest home-index collisions.
///
/// `keys` must be non-empty and duplicate-free. The returned layout is never
/// smaller than `current` and always holds `keys.len()` slots.
pub fn search<const N: usize>(
    keys: &[DispatchKey<N>],
    current: TableLayout<N>,
    tuning: &Tuning,
    histogram: &mut DynamicBitSet,
) -> SearchOutcome<N> {
    let count = keys.len();
    debug_assert!(count > 0, "search needs at least one key");
    let logs = log_size_range(count, current.log_size, tuning);
    let diversity = KeyDiversity::from_keys(keys);

    let mut best: Option<SearchOutcome<N>> = None;
    let mut candidates = 0usize;

    if current.capacity() >= count {
        candidates += 1;
        let distinct = score(&current, keys, histogram);
        best = Some(SearchOutcome {
            layout: current,
            distinct,
            keys: count,
            candidates,
        });
    }

    let per_log = (tuning.max_candidates / (logs.end() - logs.start() + 1) as usize).max(1);

    'search: for log_size in logs {
        if best.is_some_and(|b| b.is_perfect()) {
            break;
        }
        let span = int_root(per_log, diversity.searched_positions(log_size).max(1));

        let mut lo = [0u32; N];
        let mut hi = [0u32; N];
        for pos in 0..N {
            let range = diversity.shift_range(pos, log_size, current.shifts[pos], span);
            lo[pos] = *range.start();
            hi[pos] = *range.end();
        }

        let mut shifts = lo;
        loop {
            let layout = TableLayout { log_size, shifts };
            candidates += 1;
            let distinct = score(&layout, keys, histogram);
            if best.is_none_or(|b| distinct > b.distinct) {
                best = Some(SearchOutcome {
                    layout,
                    distinct,
                    keys: count,
                    candidates,
                });
                if distinct == count {
                    break 'search;
                }
            }

            // Odometer over the per-position shift ranges.
            let mut pos = 0;
            loop {
                if pos == N {
                    continue 'search;
                }
                if shifts[pos] < hi[pos] {
                    shifts[pos] += 1;
                    break;
                }
                shifts[pos] = lo[pos];
                pos += 1;
            }
        }
    }

    let mut outcome = match best {
        Some(outcome) => outcome,
        None => unreachable!("log_size_range is never empty"),
    };
    outcome.candidates = candidates;
    outcome
}
