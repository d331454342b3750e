//! Small, self-contained bit utilities and containers used by the dispatch cache.

pub mod bits;
pub mod bitset;
pub mod interleave;
pub mod stable_arena;

pub use bits::{bits_required, highest_set_bit, population_count, trailing_zero_count};
pub use bitset::DynamicBitSet;
pub use interleave::{interleave_2, interleave_3, interleave_4};
pub use stable_arena::StableArena;
