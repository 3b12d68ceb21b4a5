//! Hashed collections used across Orrery.
//!
//! AHash-backed maps. Registry lookups are keyed by `TypeId`.

pub use ahash::AHashMap as HashMap;
