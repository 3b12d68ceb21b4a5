//! Test utilities for the Orrery engine.
//!
//! This crate provides recording systems for exercising a
//! [`SystemStorage`](orrery::SystemStorage) without real engine subsystems.
//!
//! - [`Journal`] - a shared, ordered log of every callback a probe received
//! - [`Probe`] - a configurable [`System`](orrery::System) that writes to a journal
//!
//! # Example
//!
//! ```rust
//! use orrery::{StorageContext, SystemStorage};
//! use orrery_test_utils::{Hook, Journal, Probe};
//!
//! struct Window;
//! struct Renderer;
//!
//! let journal = Journal::new();
//! let mut storage = SystemStorage::new(StorageContext::default());
//! storage.register(Probe::<Window>::new("window", &journal)).unwrap();
//! storage.register(Probe::<Renderer>::new("renderer", &journal)).unwrap();
//! storage.start().unwrap();
//!
//! assert_eq!(journal.systems_for(Hook::Attach), vec!["window", "renderer"]);
//! ```
//!
//! # Interior Mutability
//!
//! Probes are owned by the storage, so the test keeps a cloned [`Journal`]
//! handle and reads it back afterwards. The log sits behind a
//! `parking_lot::Mutex` so `is_requesting_exit(&self)` can record too.

pub mod journal;
pub mod probe;

pub use journal::{Call, Hook, Journal};
pub use probe::Probe;
