// Block hashing for the delta codec.
//
// This module provides:
// - The `Hasher` trait and a Rabin-Karp rolling hash
// - Fixed-size block partitioning of a reference text
// - A hash-keyed block index with verified, greedily extended matches

pub mod config;
pub mod rolling;
pub mod table;

pub use rolling::{Hasher, RollingHash};
pub use table::{BlockIndex, Match};
