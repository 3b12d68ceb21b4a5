//! Orrery Core
//!
//! Ambient utilities shared by every Orrery crate: logging bootstrap,
//! profiling hooks, hashed collections and configuration values.

pub mod alloc;
pub mod config;
pub mod logging;
pub mod profiling;

pub use config::{Config, ConfigError, ConfigVars, ProfilingMode};
