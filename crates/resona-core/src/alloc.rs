//! Optimized collection types for Resona.
//!
//! Re-exports hash collections backed by AHash, which hashes the small
//! string and integer keys used throughout the asset tables faster than
//! the SipHash default.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
