//! Property-based tests for the dispatch cache.
//!
//! Run with: `cargo test --test property`

mod cache_model;
mod interleave_equivalence;
mod layout_growth;
