//! Runtime multi-key type-dispatch cache.
//!
//! ## Scope
//! A type switch over one to four polymorphic subjects spends most of its time
//! answering the same question: "which case matched for this combination of
//! dynamic types?" This crate caches that answer per call site, keyed by a
//! tuple of per-type identity words (vtable addresses), and keeps the lookup a
//! single shift/interleave/mask probe as new type combinations appear.
//!
//! ## Key invariants
//! - Every distinct key is stored exactly once and never removed.
//! - A value's address never changes once inserted, across every
//!   reconfiguration.
//! - The table only grows.
//! - Right-place: a key whose home slot is free is not in the table.
//!
//! ## Lookup flow
//! 1) Shift each identity word, interleave the results, mask to the table size.
//! 2) Hit at home, or repair a displaced key, or insert a new one.
//! 3) On a full table or repeated collisions, search for a better
//!    `(log_size, shifts)` layout and migrate into it.
//!
//! ## Notable entry points
//! - `DispatchCache`: the per-call-site cache.
//! - `DispatchKey`, `SwitchInfo`: key and typical cached payload.
//! - `TypeIdentity`, `vtable_identity`, `adjust_ptr`: the unsafe boundary
//!   between trait objects and the cache.
//! - `Tuning`: search and budget knobs.

pub mod dispatch;
pub mod identity;
pub mod stdx;
#[cfg(test)]
pub mod test_utils;

mod api;
mod demo;

pub use api::{DispatchKey, SwitchInfo, Tuning, TuningError, IRRELEVANT_BITS, MAX_ARITY};

pub use demo::{
    AreaSwitch, Circle, Collision, CollisionSwitch, Contact, Labeled, ShapeKind, Square, Triangle,
};

#[cfg(feature = "stats")]
pub use dispatch::CacheStats;
pub use dispatch::{CacheReport, DispatchCache, TableLayout};

pub use identity::{
    adjust_ptr, identity_of_type_id, subobject_offset, type_id_identity, vtable_identity,
    TypeIdentity,
};
