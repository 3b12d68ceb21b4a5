//! Shared call log.

use std::sync::Arc;

use orrery::FramePhase;
use parking_lot::Mutex;

/// A callback a probe can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Attach,
    Finalize,
    RunEngine,
    Phase(FramePhase),
    ExitPoll,
    Drop,
}

impl From<FramePhase> for Hook {
    fn from(phase: FramePhase) -> Self {
        Hook::Phase(phase)
    }
}

/// One recorded callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub system: &'static str,
    pub hook: Hook,
}

/// Ordered record of callbacks, shared between probes and the test.
///
/// Cloning yields another handle to the same log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, system: &'static str, hook: Hook) {
        self.calls.lock().push(Call { system, hook });
    }

    /// Snapshot of every call so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// The systems that received `hook`, in the order they received it.
    pub fn systems_for(&self, hook: impl Into<Hook>) -> Vec<&'static str> {
        let hook = hook.into();
        self.calls
            .lock()
            .iter()
            .filter(|call| call.hook == hook)
            .map(|call| call.system)
            .collect()
    }

    /// The hooks `system` received, in order.
    pub fn hooks_for(&self, system: &str) -> Vec<Hook> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.system == system)
            .map(|call| call.hook)
            .collect()
    }

    pub fn count(&self, hook: impl Into<Hook>) -> usize {
        let hook = hook.into();
        self.calls.lock().iter().filter(|call| call.hook == hook).count()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}
