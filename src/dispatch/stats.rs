//! Dispatch cache diagnostics.
//!
//! - `CacheStats` (feature `stats`): event counters updated on every lookup.
//!   Counters saturate instead of wrapping.
//! - [`CacheReport`]: a snapshot of the current layout and occupancy, always
//!   available. Its `Display` output is a one-line summary suitable for
//!   printing at shutdown.

use std::fmt;

/// Events counted by `CacheStats`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(feature = "stats"), allow(dead_code))]
pub(crate) enum StatEvent {
    Hit,
    Insert,
    Repair,
    Collision,
    Reconfiguration { rebuilt: bool, candidates: usize },
}

/// Per-cache event counters (feature: `stats`).
#[cfg(feature = "stats")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the home slot.
    pub hits: u64,
    /// New keys stored.
    pub inserts: u64,
    /// Lookups that found the key displaced and moved it home.
    pub repairs: u64,
    /// Lookups whose home slot held another key that was itself at home.
    pub collisions: u64,
    /// Layout searches run.
    pub reconfigurations: u64,
    /// Searches that replaced the table.
    pub rebuilds: u64,
    /// Candidate layouts scored across all searches.
    pub candidates_scored: u64,
}

#[cfg(feature = "stats")]
#[inline(always)]
fn sat_add_u64(counter: &mut u64, delta: u64) {
    *counter = counter.saturating_add(delta);
}

#[cfg(feature = "stats")]
impl CacheStats {
    #[inline]
    pub(crate) fn record(&mut self, event: StatEvent) {
        match event {
            StatEvent::Hit => sat_add_u64(&mut self.hits, 1),
            StatEvent::Insert => sat_add_u64(&mut self.inserts, 1),
            StatEvent::Repair => sat_add_u64(&mut self.repairs, 1),
            StatEvent::Collision => sat_add_u64(&mut self.collisions, 1),
            StatEvent::Reconfiguration {
                rebuilt,
                candidates,
            } => {
                sat_add_u64(&mut self.reconfigurations, 1);
                sat_add_u64(&mut self.rebuilds, rebuilt as u64);
                sat_add_u64(&mut self.candidates_scored, candidates as u64);
            }
        }
    }

    /// Lookups of any kind.
    pub fn lookups(&self) -> u64 {
        self.hits
            .saturating_add(self.inserts)
            .saturating_add(self.repairs)
    }
}

/// Snapshot of a dispatch cache's layout and occupancy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheReport {
    /// Subjects per key.
    pub arity: usize,
    /// `log2` of the slot count.
    pub log_size: u32,
    /// Slot count.
    pub capacity: usize,
    /// Shift per key position.
    pub shifts: Vec<u32>,
    /// Distinct keys stored.
    pub keys: usize,
    /// Keys not at their home index.
    pub displaced: usize,
    /// Layout searches run so far.
    pub reconfigurations: u32,
    /// Collisions still tolerated before the next search.
    pub collision_budget: u32,
    /// Bytes held by the table, values, and search scratch.
    pub memory_bytes: usize,
    /// Event counters.
    #[cfg(feature = "stats")]
    pub stats: CacheStats,
}

impl CacheReport {
    /// Fraction of slots in use.
    pub fn load_factor(&self) -> f64 {
        self.keys as f64 / self.capacity as f64
    }
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arity={} log_size={} capacity={} shifts={:?} keys={} displaced={} \
             reconfigurations={} budget={} memory={}B",
            self.arity,
            self.log_size,
            self.capacity,
            self.shifts,
            self.keys,
            self.displaced,
            self.reconfigurations,
            self.collision_budget,
            self.memory_bytes,
        )?;
        #[cfg(feature = "stats")]
        write!(
            f,
            " hits={} inserts={} repairs={} collisions={} rebuilds={} candidates={}",
            self.stats.hits,
            self.stats.inserts,
            self.stats.repairs,
            self.stats.collisions,
            self.stats.rebuilds,
            self.stats.candidates_scored,
        )?;
        Ok(())
    }
}
