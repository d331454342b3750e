//! Integration tests for the typeswitch-rs dispatch cache.
//!
//! Run with: `cargo test --test integration`

mod demo_switch;
mod report;
mod scenarios;
mod tuning;
