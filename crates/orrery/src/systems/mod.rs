//! Built-in systems.
//!
//! These are ordinary clients of the registry: they only use the public
//! [`System`](crate::System) contract and can be replaced by application
//! systems with the same role.

mod frame_limit;
mod time;

pub use frame_limit::FrameLimit;
pub use time::TimeSystem;
