//! Engine - owns the system storage and drives the frame loop.

use orrery_core::config::{Config, ConfigVars, ProfilingMode};
use orrery_core::profiling::{self, ProfilingBackend};

use crate::context::StorageContext;
use crate::dispatch::FrameOutcome;
use crate::error::{EngineError, RegistryError};
use crate::storage::{LifecycleState, SystemIndex, SystemStorage};
use crate::system::System;

/// The application-side owner of every system.
///
/// # Example
///
/// ```
/// use orrery::{EngineBuilder, FrameLimit, TimeSystem};
/// use orrery_core::ConfigVars;
///
/// let mut engine = EngineBuilder::new()
///     .with_config_vars(ConfigVars::from_pairs([("engine.max_frames", "3")]))
///     .with_system(TimeSystem::new())
///     .with_system(FrameLimit::new())
///     .build()
///     .unwrap();
///
/// assert_eq!(engine.run().unwrap(), 3);
/// ```
pub struct Engine {
    storage: SystemStorage,
    config: Config,
}

impl Engine {
    /// Create a new engine builder.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Create an engine with no systems.
    pub fn new(config_vars: ConfigVars) -> Result<Self, EngineError> {
        let config = Config::from_vars(&config_vars)?;
        apply_profiling(config.profiling);

        Ok(Self {
            storage: SystemStorage::new(StorageContext::new(config_vars)),
            config,
        })
    }

    /// Register a system; see [`SystemStorage::register`].
    pub fn register<T: System>(&mut self, system: T) -> Result<SystemIndex, EngineError> {
        Ok(self.storage.register(system)?)
    }

    /// Attach and finalize every system; see [`SystemStorage::start`].
    pub fn start(&mut self) -> Result<(), EngineError> {
        Ok(self.storage.start()?)
    }

    /// Dispatch a single frame.
    pub fn tick(&mut self) -> Result<FrameOutcome, EngineError> {
        profiling::new_frame();
        Ok(self.storage.dispatch_frame()?)
    }

    /// Run frames until a system requests exit. Returns the number of frames run.
    ///
    /// Starts the systems first if [`start`](Self::start) was not called.
    pub fn run(&mut self) -> Result<u64, EngineError> {
        if self.storage.state().accepts_registration() {
            self.start()?;
        }
        if !self.storage.engine_running {
            self.storage.run_engine()?;
        }

        let first_frame = self.storage.frame_count();
        loop {
            let outcome = self.tick()?;
            if outcome.exit_requested {
                let frames = outcome.frame - first_frame;
                tracing::info!("Engine stopped after {} frames", frames);
                return Ok(frames);
            }
        }
    }

    /// Borrow a system from the owning side.
    pub fn get<T: System>(&self) -> Result<&T, RegistryError> {
        self.storage.get::<T>()
    }

    /// Mutably borrow a system from the owning side.
    pub fn get_mut<T: System>(&mut self) -> Result<&mut T, RegistryError> {
        self.storage.get_mut::<T>()
    }

    pub fn contains<T: System>(&self) -> bool {
        self.storage.contains::<T>()
    }

    pub fn state(&self) -> LifecycleState {
        self.storage.state()
    }

    pub fn storage(&self) -> &SystemStorage {
        &self.storage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn apply_profiling(mode: ProfilingMode) {
    match mode {
        ProfilingMode::Off => {}
        ProfilingMode::On => profiling::init_profiling(ProfilingBackend::InProcess),
        #[cfg(feature = "profiling")]
        ProfilingMode::WithWebServer => profiling::init_profiling(ProfilingBackend::PuffinHttp),
        #[cfg(not(feature = "profiling"))]
        ProfilingMode::WithWebServer => {
            tracing::warn!("Profiling server requested but the `profiling` feature is disabled");
            profiling::init_profiling(ProfilingBackend::InProcess);
        }
    }
}

type Registration = Box<dyn FnOnce(&mut Engine) -> Result<SystemIndex, EngineError>>;

/// Builder for constructing an [`Engine`] with systems.
///
/// Systems are registered in the order they are added; that order is the
/// dependency order.
pub struct EngineBuilder {
    config_vars: ConfigVars,
    registrations: Vec<Registration>,
}

impl EngineBuilder {
    /// Create a new engine builder.
    pub fn new() -> Self {
        Self {
            config_vars: ConfigVars::new(),
            registrations: Vec::new(),
        }
    }

    /// Merge config vars into the startup configuration. Later calls win.
    pub fn with_config_vars(mut self, vars: ConfigVars) -> Self {
        self.config_vars.merge(vars);
        self
    }

    /// Set a single config var.
    pub fn with_config_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_vars.set(key, value);
        self
    }

    /// Add a system after the ones already added.
    pub fn with_system<T: System>(mut self, system: T) -> Self {
        self.registrations
            .push(Box::new(move |engine: &mut Engine| engine.register(system)));
        self
    }

    /// Build the engine, registering every system.
    ///
    /// Fails on the first registration error. Systems are not started; call
    /// [`Engine::start`] or [`Engine::run`].
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut engine = Engine::new(self.config_vars)?;
        for register in self.registrations {
            register(&mut engine)?;
        }

        tracing::debug!("Engine built with {} systems", engine.storage.len());
        Ok(engine)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Locator, SystemResult};

    struct Setting {
        title: String,
    }

    impl System for Setting {
        fn on_attach(&mut self, _: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
            self.title = context.var_or("game.title", "untitled".to_string())?;
            Ok(())
        }
    }

    struct StopAt(u64, u64);

    impl System for StopAt {
        fn on_process_frame(&mut self, _: &mut Locator<'_>) {
            self.0 += 1;
        }

        fn is_requesting_exit(&self) -> bool {
            self.0 >= self.1
        }
    }

    #[test]
    fn test_engine_builder() {
        let mut engine = EngineBuilder::new()
            .with_config_var("game.title", "Orbit")
            .with_system(Setting {
                title: String::new(),
            })
            .build()
            .unwrap();

        assert_eq!(engine.state(), LifecycleState::Registering);
        engine.start().unwrap();
        assert_eq!(engine.get::<Setting>().unwrap().title, "Orbit");
    }

    #[test]
    fn test_builder_reports_duplicates() {
        let result = EngineBuilder::new()
            .with_system(StopAt(0, 1))
            .with_system(StopAt(0, 2))
            .build();

        assert!(matches!(
            result,
            Err(EngineError::Registry(RegistryError::DuplicateRegistration { .. }))
        ));
    }

    #[test]
    fn test_run_starts_and_counts_frames() {
        let mut engine = EngineBuilder::new()
            .with_system(StopAt(0, 4))
            .build()
            .unwrap();

        assert_eq!(engine.run().unwrap(), 4);
        assert_eq!(engine.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_bad_engine_config() {
        let result = EngineBuilder::new()
            .with_config_var(Config::PROFILING_KEY, "sometimes")
            .build();
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_profiling_mode_enables_scopes() {
        let mut engine = EngineBuilder::new()
            .with_config_var(Config::PROFILING_KEY, "on")
            .with_system(StopAt(0, 2))
            .build()
            .unwrap();

        assert_eq!(engine.config().profiling, ProfilingMode::On);
        assert!(profiling::is_enabled());
        assert_eq!(engine.run().unwrap(), 2);
    }

    #[test]
    fn test_default_engine() {
        let engine = EngineBuilder::default().build().unwrap();
        assert!(engine.storage().is_empty());
        assert_eq!(engine.config().profiling, ProfilingMode::Off);
    }
}
