//! Error types for the system registry.

use std::fmt;

use crate::storage::{LifecycleState, SystemIndex};
use crate::system::SystemError;

/// Who asked for a system that could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    /// The application owning the storage.
    Owner,
    /// A registered system, from inside one of its callbacks.
    System {
        name: &'static str,
        index: SystemIndex,
    },
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requester::Owner => write!(f, "the storage owner"),
            Requester::System { name, index } => write!(f, "{} (index {})", name, index),
        }
    }
}

fn registration_hint(registered_at: &Option<SystemIndex>) -> String {
    match registered_at {
        Some(index) => format!("registered at index {}", index),
        None => "never registered".to_string(),
    }
}

/// Wiring errors: registering or looking up systems incorrectly.
///
/// These indicate a bug in how the application assembled its systems, not a
/// runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The type is already registered.
    #[error("System {type_name} is already registered at index {existing_index}")]
    DuplicateRegistration {
        type_name: &'static str,
        existing_index: SystemIndex,
    },

    /// The operation is not legal in the current lifecycle state.
    #[error("Cannot {operation} while the storage is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    /// The type was never registered, or is not visible to the requester.
    #[error("System {type_name} is not visible to {requester} ({})", registration_hint(.registered_at))]
    NotFound {
        type_name: &'static str,
        requester: Requester,
        registered_at: Option<SystemIndex>,
    },
}

/// A startup pass that a system refused.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("System {system} (index {index}) failed to attach: {source}")]
    AttachFailed {
        system: &'static str,
        index: SystemIndex,
        #[source]
        source: SystemError,
    },

    #[error("System {system} (index {index}) failed to finalize: {source}")]
    FinalizeFailed {
        system: &'static str,
        index: SystemIndex,
        #[source]
        source: SystemError,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl StartupError {
    /// Index of the system that refused, if a system did.
    pub fn failed_index(&self) -> Option<SystemIndex> {
        match self {
            StartupError::AttachFailed { index, .. } | StartupError::FinalizeFailed { index, .. } => {
                Some(*index)
            }
            StartupError::Registry(_) => None,
        }
    }

    /// The system's own error, if a system refused.
    pub fn system_error(&self) -> Option<&SystemError> {
        match self {
            StartupError::AttachFailed { source, .. }
            | StartupError::FinalizeFailed { source, .. } => Some(source),
            StartupError::Registry(_) => None,
        }
    }
}

/// Anything the [`Engine`](crate::Engine) surface can fail with.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] orrery_core::ConfigError),
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
