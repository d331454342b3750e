//! Public data types: dispatch keys, the bundled dispatch payload, and tuning.
//!
//! ## Keys
//! A [`DispatchKey`] is a fixed-length tuple of type-identity words, one per
//! subject of a type switch. The all-zero tuple marks a free table slot, so
//! every real identity word must be non-zero. Identity extraction guarantees
//! this through `NonZeroUsize`; [`DispatchKey::new`] checks it in debug builds.
//!
//! ## Tuning
//! [`Tuning`] holds the collision budgets and search bounds of the
//! reconfiguration algorithm. The defaults are empirical; see `DESIGN.md`.

use std::fmt;
use std::num::NonZeroUsize;

use crate::stdx::bits::WORD_BITS;

/// Largest supported number of subjects per key.
pub const MAX_ARITY: usize = 4;

/// Low bits of a vtable address that never vary because vtables are aligned to
/// at least a pointer: 3 on 64-bit targets, 2 on 32-bit targets.
pub const IRRELEVANT_BITS: u32 = size_of::<usize>().trailing_zeros();

/// Ordered tuple of non-zero type-identity words, one per switch subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DispatchKey<const N: usize>([usize; N]);

impl<const N: usize> DispatchKey<N> {
    /// The free-slot marker. Never a valid key.
    pub const EMPTY: Self = Self([0; N]);

    /// Wraps raw identity words.
    ///
    /// Every word must be non-zero; this is checked in debug builds only, the
    /// identity collaborator owns the guarantee.
    #[inline]
    pub fn new(words: [usize; N]) -> Self {
        debug_assert!(
            words.iter().all(|&w| w != 0),
            "dispatch key words must be non-zero: {words:x?}"
        );
        Self(words)
    }

    /// Builds a key from checked identity words.
    #[inline]
    pub fn from_identities(ids: [NonZeroUsize; N]) -> Self {
        Self(ids.map(NonZeroUsize::get))
    }

    /// Returns the identity words.
    #[inline]
    pub fn words(&self) -> &[usize; N] {
        &self.0
    }

    /// Returns `true` for the free-slot marker.
    ///
    /// Real keys have every word non-zero, so the first word decides.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl<const N: usize> Default for DispatchKey<N> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<const N: usize> From<[NonZeroUsize; N]> for DispatchKey<N> {
    fn from(ids: [NonZeroUsize; N]) -> Self {
        Self::from_identities(ids)
    }
}

/// Cached decision of a type switch for one key.
///
/// `target` names the case branch to run (`0` means not resolved yet);
/// `offsets[i]` is the byte offset from subject `i`'s generic pointer to the
/// sub-object the branch expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwitchInfo<const N: usize> {
    /// Case branch, 1-based; `0` while unresolved.
    pub target: u32,
    /// Per-subject pointer adjustment in bytes.
    pub offsets: [isize; N],
}

impl<const N: usize> SwitchInfo<N> {
    /// A payload that has not been resolved by the switch yet.
    pub const UNRESOLVED: Self = Self {
        target: 0,
        offsets: [0; N],
    };

    /// Returns `true` once a branch has been recorded.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.target != 0
    }

    /// Records the branch and per-subject offsets.
    #[inline]
    pub fn resolve(&mut self, target: u32, offsets: [isize; N]) {
        debug_assert!(target != 0, "target 0 is reserved for unresolved");
        self.target = target;
        self.offsets = offsets;
    }
}

impl<const N: usize> Default for SwitchInfo<N> {
    fn default() -> Self {
        Self::UNRESOLVED
    }
}

/// Reconfiguration knobs for a dispatch cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tuning {
    /// Collisions tolerated before the first reconfiguration.
    pub first_collision_budget: u32,
    /// Collisions tolerated between later reconfigurations.
    pub collision_budget: u32,

    /// How many sizes above the minimum the search may try (`log2` steps).
    pub max_log_inc: u32,
    /// Smallest table size (`log2`).
    pub min_log_size: u32,
    /// Largest table size (`log2`). The cache still grows past it when the
    /// key count demands, but the search never proposes anything larger by
    /// choice.
    pub max_log_size: u32,

    /// Upper bound on (size, shift) combinations scored per reconfiguration.
    pub max_candidates: usize,

    /// Shift used before any keys have been observed.
    pub initial_shift: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            first_collision_budget: 1,
            collision_budget: 16,
            max_log_inc: 1,
            min_log_size: 1,
            max_log_size: 24,
            max_candidates: 4096,
            initial_shift: IRRELEVANT_BITS,
        }
    }
}

/// Reasons a [`Tuning`] is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TuningError {
    /// `min_log_size` exceeds `max_log_size`.
    LogSizeRange { min: u32, max: u32 },
    /// `max_log_size` cannot be addressed by a machine word.
    LogSizeTooLarge { max: u32 },
    /// `max_candidates` is zero, so the search could not score anything.
    NoCandidates,
    /// `initial_shift` shifts every key bit out of the word.
    ShiftTooLarge { shift: u32 },
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogSizeRange { min, max } => {
                write!(f, "min_log_size {min} exceeds max_log_size {max}")
            }
            Self::LogSizeTooLarge { max } => {
                write!(f, "max_log_size {max} must be below {}", WORD_BITS - 1)
            }
            Self::NoCandidates => write!(f, "max_candidates must be > 0"),
            Self::ShiftTooLarge { shift } => {
                write!(f, "initial_shift {shift} must be below {WORD_BITS}")
            }
        }
    }
}

impl std::error::Error for TuningError {}

impl Tuning {
    /// Checks the knobs for internal consistency.
    pub fn validate(&self) -> Result<(), TuningError> {
        if self.max_log_size >= WORD_BITS - 1 {
            return Err(TuningError::LogSizeTooLarge {
                max: self.max_log_size,
            });
        }
        if self.min_log_size > self.max_log_size {
            return Err(TuningError::LogSizeRange {
                min: self.min_log_size,
                max: self.max_log_size,
            });
        }
        if self.max_candidates == 0 {
            return Err(TuningError::NoCandidates);
        }
        if self.initial_shift >= WORD_BITS {
            return Err(TuningError::ShiftTooLarge {
                shift: self.initial_shift,
            });
        }
        Ok(())
    }

    /// Internal invariant check used at cache construction.
    pub(crate) fn assert_valid(&self) {
        if let Err(err) = self.validate() {
            panic!("invalid dispatch cache tuning: {err}");
        }
    }
}
