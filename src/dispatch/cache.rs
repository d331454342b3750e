//! Per-call-site dispatch cache.
//!
//! Purpose: answer "what did this type switch decide for this tuple of
//! dynamic types?" in one probe on the steady-state path, while the set of
//! observed type tuples keeps growing.
//!
//! Invariants:
//! - Exactly one live [`CacheDescriptor`]; reconfiguration builds its
//!   replacement, migrates every key, then drops the old one by reassignment.
//! - `log_size` never decreases.
//! - Values live in a [`StableArena`]: a value's address never changes once it
//!   is inserted, regardless of reconfigurations.
//! - The distinct key count equals the arena length and never decreases.
//!
//! Reconfiguration triggers:
//! - The table has no free slot for a new key (always).
//! - A collision arrives with the collision budget exhausted and the key set
//!   has grown since the last search. A search over an unchanged key set would
//!   reproduce the current answer, so it is skipped.
//!
//! Concurrency:
//! - Not thread-safe and not meant to be shared; `get` takes `&mut self`. Use
//!   one cache per thread when several threads run the same switch.

use super::descriptor::{CacheDescriptor, Lookup, TableLayout};
use super::reconfig::{self, SearchOutcome};
#[cfg(feature = "stats")]
use super::stats::CacheStats;
use super::stats::{CacheReport, StatEvent};
use crate::api::{DispatchKey, Tuning, TuningError};
use crate::stdx::bits::bits_required;
use crate::stdx::bitset::DynamicBitSet;
use crate::stdx::stable_arena::StableArena;

/// Self-tuning map from [`DispatchKey`] to a dispatch value `V`.
///
/// # Examples
/// ```
/// use typeswitch_rs::{DispatchCache, DispatchKey};
///
/// let mut cache: DispatchCache<u32, 1> = DispatchCache::new(4);
/// *cache.get(DispatchKey::new([0x1000])) += 1;
/// *cache.get(DispatchKey::new([0x1000])) += 1;
/// assert_eq!(2, *cache.get(DispatchKey::new([0x1000])));
/// assert_eq!(1, cache.len());
/// ```
#[derive(Debug)]
pub struct DispatchCache<V, const N: usize> {
    descriptor: CacheDescriptor<N>,
    values: StableArena<V>,
    tuning: Tuning,

    /// Collisions tolerated before the next search.
    collision_budget: u32,
    /// Distinct key count when the last search ran.
    keys_at_reconfig: usize,
    reconfigurations: u32,

    /// Occupancy histogram reused across searches.
    histogram: DynamicBitSet,

    #[cfg(feature = "stats")]
    stats: CacheStats,
}

impl<V, const N: usize> DispatchCache<V, N> {
    /// Creates a cache sized for about `expected_keys` distinct keys.
    pub fn new(expected_keys: usize) -> Self {
        Self::with_tuning(expected_keys, Tuning::default())
    }

    /// Creates a cache with explicit tuning.
    ///
    /// # Panics
    ///
    /// Panics if `tuning` fails [`Tuning::validate`].
    pub fn with_tuning(expected_keys: usize, tuning: Tuning) -> Self {
        tuning.assert_valid();
        Self::build(expected_keys, tuning)
    }

    /// Creates a cache with explicit tuning, rejecting invalid knobs.
    pub fn try_with_tuning(expected_keys: usize, tuning: Tuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self::build(expected_keys, tuning))
    }

    fn build(expected_keys: usize, tuning: Tuning) -> Self {
        let log_size = bits_required(expected_keys.saturating_sub(1))
            .clamp(tuning.min_log_size, tuning.max_log_size);
        let layout = TableLayout {
            log_size,
            shifts: [tuning.initial_shift; N],
        };
        Self {
            descriptor: CacheDescriptor::new(layout),
            values: StableArena::with_first_chunk(expected_keys),
            tuning,
            collision_budget: tuning.first_collision_budget,
            keys_at_reconfig: 0,
            reconfigurations: 0,
            histogram: DynamicBitSet::default(),
            #[cfg(feature = "stats")]
            stats: CacheStats::default(),
        }
    }

    /// Returns the value for `key`, inserting `V::default()` for a new key.
    ///
    /// Never fails; capacity and collisions are handled internally. The
    /// returned storage stays at the same address for the cache's lifetime.
    #[inline]
    pub fn get(&mut self, key: DispatchKey<N>) -> &mut V
    where
        V: Default,
    {
        self.get_with(key, |_| V::default())
    }

    /// Returns the value for `key`, inserting `init(&key)` for a new key.
    #[inline]
    pub fn get_with<F>(&mut self, key: DispatchKey<N>, init: F) -> &mut V
    where
        F: FnOnce(&DispatchKey<N>) -> V,
    {
        let handle = self.resolve(key, init);
        self.values.get_mut(handle as usize)
    }

    /// Returns `true` if `key` has been inserted. Does not repair or insert.
    pub fn contains(&self, key: &DispatchKey<N>) -> bool {
        self.descriptor.find(key).is_some()
    }

    /// Returns the value for `key` without inserting or repairing.
    pub fn peek(&self, key: &DispatchKey<N>) -> Option<&V> {
        let slot = self.descriptor.find(key)?;
        Some(self.values.get(self.descriptor.slot(slot).handle as usize))
    }

    /// Distinct keys stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` before the first insertion.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current table layout.
    #[inline]
    pub fn layout(&self) -> TableLayout<N> {
        self.descriptor.layout()
    }

    /// `log2` of the current slot count.
    #[inline]
    pub fn log_size(&self) -> u32 {
        self.descriptor.log_size()
    }

    /// Current shift per key position.
    #[inline]
    pub fn shifts(&self) -> [u32; N] {
        self.descriptor.layout().shifts
    }

    /// Tuning in effect.
    #[inline]
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Layout searches run so far.
    #[inline]
    pub fn reconfigurations(&self) -> u32 {
        self.reconfigurations
    }

    /// Bytes held by this cache, including its own header.
    pub fn memory_used(&self) -> usize {
        size_of::<Self>()
            + self.descriptor.memory_bytes()
            + self.values.memory_bytes()
            + self.histogram.memory_bytes()
    }

    /// Iterates stored keys and values in table order.
    pub fn iter(&self) -> impl Iterator<Item = (DispatchKey<N>, &V)> + '_ {
        self.descriptor
            .live_slots()
            .map(|slot| (slot.key, self.values.get(slot.handle as usize)))
    }

    /// Event counters (feature: `stats`).
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Snapshot of layout, occupancy, and counters.
    pub fn report(&self) -> CacheReport {
        let layout = self.descriptor.layout();
        CacheReport {
            arity: N,
            log_size: layout.log_size,
            capacity: layout.capacity(),
            shifts: layout.shifts.to_vec(),
            keys: self.len(),
            displaced: self.descriptor.displaced(),
            reconfigurations: self.reconfigurations,
            collision_budget: self.collision_budget,
            memory_bytes: self.memory_used(),
            #[cfg(feature = "stats")]
            stats: self.stats,
        }
    }

    /// Verifies table invariants and that every handle is in range.
    ///
    /// # Panics
    ///
    /// Panics on the first violation. Intended for tests.
    pub fn check_invariants(&self) {
        self.descriptor.check_invariants();
        assert_eq!(
            self.values.len(),
            self.descriptor.occupied(),
            "key count out of sync with the table"
        );
        let mut seen = DynamicBitSet::empty(self.values.len());
        for slot in self.descriptor.live_slots() {
            assert!(
                !seen.test_and_set(slot.handle as usize),
                "value handle {} shared by two keys",
                slot.handle
            );
        }
    }

    // ----- Internals -----

    #[inline(always)]
    fn record(&mut self, _event: StatEvent) {
        #[cfg(feature = "stats")]
        self.stats.record(_event);
    }

    /// Finds or inserts `key` and returns its value handle.
    #[inline]
    fn resolve<F>(&mut self, key: DispatchKey<N>, init: F) -> u32
    where
        F: FnOnce(&DispatchKey<N>) -> V,
    {
        let mut init = Some(init);
        let (handle, conflict) = loop {
            // The value is pushed before the descriptor writes the slot, so an
            // unwinding `init` leaves both untouched.
            let claim = || {
                let handle =
                    u32::try_from(self.values.len()).expect("dispatch cache key count overflow");
                let Some(init) = init.take() else {
                    unreachable!("a lookup claims at most one slot")
                };
                self.values.push(init(&key));
                handle
            };
            match self.descriptor.lookup_or_repair(&key, claim) {
                Lookup::Hit { handle, .. } => {
                    self.record(StatEvent::Hit);
                    return handle;
                }
                Lookup::Repaired {
                    handle, conflict, ..
                } => {
                    self.record(StatEvent::Repair);
                    break (handle, conflict);
                }
                Lookup::Inserted {
                    handle, conflict, ..
                } => {
                    self.record(StatEvent::Insert);
                    break (handle, conflict);
                }
                Lookup::NoRoom => self.reconfigure(Some(key)),
            }
        };
        if conflict {
            self.on_collision();
        }
        handle
    }

    #[cold]
    fn on_collision(&mut self) {
        self.record(StatEvent::Collision);
        if self.collision_budget > 0 {
            self.collision_budget -= 1;
        } else if self.values.len() > self.keys_at_reconfig {
            self.reconfigure(None);
        }
    }

    /// Searches for a better layout over the live keys plus `pending`, and
    /// installs it if it differs from the current one.
    #[cold]
    #[inline(never)]
    fn reconfigure(&mut self, pending: Option<DispatchKey<N>>) {
        let mut keys: Vec<DispatchKey<N>> = self.descriptor.keys().collect();
        keys.extend(pending);
        let current = self.descriptor.layout();
        let outcome = reconfig::search(&keys, current, &self.tuning, &mut self.histogram);

        let rebuilt = outcome.layout != current;
        if rebuilt {
            debug_assert!(outcome.layout.log_size >= current.log_size);
            self.install(outcome);
        } else {
            tracing::trace!(
                arity = N,
                log_size = current.log_size,
                keys = outcome.keys,
                collisions = outcome.collisions(),
                candidates = outcome.candidates,
                "dispatch cache layout kept"
            );
        }

        self.reconfigurations = self.reconfigurations.saturating_add(1);
        self.collision_budget = self.tuning.collision_budget;
        self.keys_at_reconfig = keys.len();
        self.record(StatEvent::Reconfiguration {
            rebuilt,
            candidates: outcome.candidates,
        });
    }

    fn install(&mut self, outcome: SearchOutcome<N>) {
        let previous = self.descriptor.layout();
        let mut next = CacheDescriptor::new(outcome.layout);
        next.migrate_from(&self.descriptor);
        // The old table is dropped here, after migration completed.
        self.descriptor = next;

        tracing::debug!(
            arity = N,
            from_log_size = previous.log_size,
            to_log_size = outcome.layout.log_size,
            shifts = ?outcome.layout.shifts,
            keys = outcome.keys,
            collisions = outcome.collisions(),
            candidates = outcome.candidates,
            "dispatch cache reconfigured"
        );
    }
}
