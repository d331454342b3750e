//! Multi-key type-dispatch cache.
//!
//! - [`descriptor`]: one fixed-layout table and its lookup/repair step.
//! - [`reconfig`]: the layout search run on growth and repeated collisions.
//! - [`cache`]: the per-call-site object that owns a descriptor and the
//!   values, and decides when to search.
//! - [`stats`]: reports and optional event counters.

pub mod cache;
pub mod descriptor;
pub mod reconfig;
pub mod stats;

pub use cache::DispatchCache;
pub use descriptor::{CacheDescriptor, Lookup, TableLayout};
pub use reconfig::{KeyDiversity, SearchOutcome};
#[cfg(feature = "stats")]
pub use stats::CacheStats;
pub use stats::CacheReport;
