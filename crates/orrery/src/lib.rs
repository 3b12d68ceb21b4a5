//! Orrery - the system registry at the heart of a small game engine
//!
//! An engine is assembled from independent *systems* (clock, window, renderer,
//! scripting, ...). Orrery owns them, brings them up and ticks them:
//!
//! - **Registration**: each system type is registered once, in an order that
//!   doubles as its dependency order.
//! - **Startup**: every system attaches, then every system finalizes. The
//!   first refusal aborts startup.
//! - **Lookup**: a system can borrow any system registered before it through
//!   the [`Locator`] its callbacks receive.
//! - **Frames**: every frame runs five phases over all systems in
//!   registration order, then asks whether anyone wants to exit.
//!
//! # Quick Start
//!
//! ```
//! use orrery::prelude::*;
//!
//! struct Physics {
//!     steps: u64,
//! }
//!
//! impl System for Physics {
//!     fn on_attach(&mut self, locator: &mut Locator<'_>, _: &StorageContext) -> SystemResult {
//!         // The clock must be registered first.
//!         locator.locate::<TimeSystem>()?;
//!         Ok(())
//!     }
//!
//!     fn on_process_frame(&mut self, locator: &mut Locator<'_>) {
//!         if let Ok(time) = locator.locate_mut::<TimeSystem>() {
//!             while time.consume_fixed_timestep() {
//!                 self.steps += 1;
//!             }
//!         }
//!     }
//! }
//!
//! let mut engine = EngineBuilder::new()
//!     .with_config_var("engine.max_frames", "10")
//!     .with_system(TimeSystem::new())
//!     .with_system(Physics { steps: 0 })
//!     .with_system(FrameLimit::new())
//!     .build()
//!     .unwrap();
//!
//! engine.run().unwrap();
//! ```

pub mod context;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod locator;
pub mod storage;
pub mod system;
pub mod systems;
pub mod type_key;

// Re-export core types
pub use orrery_core as core;

pub use context::StorageContext;
pub use dispatch::{FrameOutcome, FramePhase};
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, RegistryError, RegistryResult, Requester, StartupError};
pub use lifecycle::StartupPass;
pub use locator::Locator;
pub use storage::{LifecycleState, SystemEntry, SystemIndex, SystemStorage};
pub use system::{System, SystemError, SystemResult};
pub use systems::{FrameLimit, TimeSystem};
pub use type_key::TypeKey;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::StorageContext;
    pub use crate::dispatch::{FrameOutcome, FramePhase};
    pub use crate::engine::{Engine, EngineBuilder};
    pub use crate::error::{EngineError, RegistryError, StartupError};
    pub use crate::locator::Locator;
    pub use crate::storage::{LifecycleState, SystemIndex, SystemStorage};
    pub use crate::system::{System, SystemResult};
    pub use crate::systems::{FrameLimit, TimeSystem};

    pub use orrery_core::ConfigVars;
}
