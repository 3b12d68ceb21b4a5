//! Two-pass startup: attach every system, then finalize every system.

use std::fmt;

use orrery_core::profiling::profile_function;

use crate::error::StartupError;
use crate::storage::{LifecycleState, SystemStorage};

/// One of the two startup passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartupPass {
    Attach,
    Finalize,
}

impl StartupPass {
    pub fn name(self) -> &'static str {
        match self {
            StartupPass::Attach => "attach",
            StartupPass::Finalize => "finalize",
        }
    }

    fn states(self) -> (LifecycleState, LifecycleState) {
        match self {
            StartupPass::Attach => (LifecycleState::Attaching, LifecycleState::Attached),
            StartupPass::Finalize => (LifecycleState::Finalizing, LifecycleState::Ready),
        }
    }
}

impl fmt::Display for StartupPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl SystemStorage {
    /// Bring every registered system up, or fail on the first refusal.
    ///
    /// Runs [`on_attach`](crate::System::on_attach) on every system in
    /// registration order, then [`on_finalize`](crate::System::on_finalize)
    /// likewise. The first error stops startup: no later system runs the
    /// failing pass, no system runs a later pass, and the storage never
    /// becomes [`Ready`](LifecycleState::Ready). Systems that already
    /// attached are only torn down when the storage is dropped.
    pub fn start(&mut self) -> Result<(), StartupError> {
        self.require_state("start", LifecycleState::accepts_registration)?;

        let started = std::time::Instant::now();
        self.run_pass(StartupPass::Attach)?;
        self.run_pass(StartupPass::Finalize)?;

        tracing::info!(
            "Started {} systems in {:.2?}: {:?}",
            self.len(),
            started.elapsed(),
            self.iter().map(|entry| entry.name()).collect::<Vec<_>>()
        );
        Ok(())
    }

    fn run_pass(&mut self, pass: StartupPass) -> Result<(), StartupError> {
        profile_function!(pass.name());
        let (running, done) = pass.states();
        self.transition(running);

        let result = self.try_for_each(|system, locator, context| {
            tracing::debug!("Running {} for {}", pass, locator.caller());
            match pass {
                StartupPass::Attach => system.on_attach(locator, context),
                StartupPass::Finalize => system.on_finalize(locator, context),
            }
        });

        if let Err((system, index, source)) = result {
            tracing::warn!(
                "System {} (index {}) refused to {}: {}",
                system,
                index,
                pass,
                source
            );
            return Err(match pass {
                StartupPass::Attach => StartupError::AttachFailed {
                    system,
                    index,
                    source,
                },
                StartupPass::Finalize => StartupError::FinalizeFailed {
                    system,
                    index,
                    source,
                },
            });
        }

        self.transition(done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::locator::Locator;
    use crate::system::{System, SystemResult};
    use crate::{StorageContext, SystemIndex};

    struct Quiet;
    impl System for Quiet {}

    struct Refuses;
    impl System for Refuses {
        fn on_attach(&mut self, _: &mut Locator<'_>, _: &StorageContext) -> SystemResult {
            Err("not today".into())
        }
    }

    struct RefusesFinalize;
    impl System for RefusesFinalize {
        fn on_finalize(&mut self, _: &mut Locator<'_>, _: &StorageContext) -> SystemResult {
            Err("late refusal".into())
        }
    }

    #[test]
    fn test_empty_storage_starts() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.start().unwrap();
        assert_eq!(storage.state(), LifecycleState::Ready);
    }

    #[test]
    fn test_attach_failure_stops_in_attaching() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(Quiet).unwrap();
        storage.register(Refuses).unwrap();

        let err = storage.start().unwrap_err();
        assert!(matches!(err, StartupError::AttachFailed { index, .. } if index == SystemIndex::new(1)));
        assert_eq!(storage.state(), LifecycleState::Attaching);
    }

    #[test]
    fn test_owner_lookup_after_attach_failure_is_invalid() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(Quiet).unwrap();
        storage.register(Refuses).unwrap();
        storage.register(RefusesFinalize).unwrap();
        assert!(storage.start().is_err());

        // RefusesFinalize never attached; Quiet did, but the pass is incomplete.
        for result in [
            storage.get::<Quiet>().map(|_| ()),
            storage.get::<RefusesFinalize>().map(|_| ()),
        ] {
            assert!(matches!(
                result,
                Err(RegistryError::InvalidState {
                    state: LifecycleState::Attaching,
                    ..
                })
            ));
        }
        assert!(storage.get_mut::<Quiet>().is_err());
    }

    #[test]
    fn test_owner_lookup_after_finalize_failure() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(Quiet).unwrap();
        storage.register(RefusesFinalize).unwrap();
        assert!(storage.start().is_err());

        // Every system attached before the finalize pass began.
        assert_eq!(storage.state(), LifecycleState::Finalizing);
        assert!(storage.get::<Quiet>().is_ok());
        assert!(storage.get::<RefusesFinalize>().is_ok());
    }

    #[test]
    fn test_finalize_failure_stops_in_finalizing() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(RefusesFinalize).unwrap();

        let err = storage.start().unwrap_err();
        assert!(matches!(err, StartupError::FinalizeFailed { .. }));
        assert_eq!(storage.state(), LifecycleState::Finalizing);
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.start().unwrap();

        let err = storage.start().unwrap_err();
        assert!(matches!(
            err,
            StartupError::Registry(RegistryError::InvalidState {
                state: LifecycleState::Ready,
                ..
            })
        ));
    }

    #[test]
    fn test_register_after_start_is_invalid() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(Quiet).unwrap();
        storage.start().unwrap();

        assert!(matches!(
            storage.register(Refuses),
            Err(RegistryError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_failed_start_cannot_be_retried() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(Refuses).unwrap();
        assert!(storage.start().is_err());
        assert!(storage.start().is_err());
    }
}
