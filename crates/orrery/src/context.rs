//! Read-only bundle handed to every system during startup.

use std::str::FromStr;

use orrery_core::{ConfigError, ConfigVars};
use static_assertions::assert_impl_all;

/// Startup data shared by reference with every system's
/// [`on_attach`](crate::System::on_attach) and
/// [`on_finalize`](crate::System::on_finalize).
///
/// Built once before any system attaches; there is no way to mutate it
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct StorageContext {
    initial_config_vars: ConfigVars,
}

assert_impl_all!(StorageContext: Send, Sync, Clone);

impl StorageContext {
    pub fn new(initial_config_vars: ConfigVars) -> Self {
        Self {
            initial_config_vars,
        }
    }

    /// The configuration the application started with.
    pub fn initial_config_vars(&self) -> &ConfigVars {
        &self.initial_config_vars
    }

    /// Typed lookup of a single config var; `Ok(None)` if absent.
    pub fn var<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.initial_config_vars.get_parsed(key)
    }

    /// Typed lookup of a single config var with a fallback.
    pub fn var_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        self.initial_config_vars.get_or(key, default)
    }
}

impl From<ConfigVars> for StorageContext {
    fn from(vars: ConfigVars) -> Self {
        Self::new(vars)
    }
}
