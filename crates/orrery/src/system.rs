//! The contract every registered system implements.

use std::any::{Any, type_name};

use crate::context::StorageContext;
use crate::locator::Locator;

/// Error a system reports when it refuses to attach or finalize.
pub type SystemError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a fallible system callback.
pub type SystemResult = Result<(), SystemError>;

/// A unit of engine functionality owned by a [`SystemStorage`](crate::SystemStorage).
///
/// Every callback has a no-op default, so a system implements only the hooks
/// it needs. All callbacks receive a [`Locator`] that can reach the systems
/// registered *before* this one; a located peer is borrowed for the duration
/// of the callback and cannot be kept.
///
/// # Lifecycle
///
/// 1. [`on_attach`](System::on_attach), once, in registration order.
/// 2. [`on_finalize`](System::on_finalize), once, after every system attached.
/// 3. [`on_run_engine`](System::on_run_engine), once, right before the first frame.
/// 4. Every frame: the five phase hooks, each visited in registration order,
///    then [`is_requesting_exit`](System::is_requesting_exit).
///
/// The system is dropped when the storage is dropped, after every system
/// registered later than it.
///
/// # Example
///
/// ```
/// use orrery::{Locator, StorageContext, System, SystemResult};
///
/// struct Counter {
///     frames: u64,
/// }
///
/// impl System for Counter {
///     fn on_attach(&mut self, _locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
///         self.frames = context.var_or("counter.start", 0)?;
///         Ok(())
///     }
///
///     fn on_end_frame(&mut self, _locator: &mut Locator<'_>) {
///         self.frames += 1;
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait System: Any {
    /// Name used in logs and diagnostics. Defaults to the type name.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// First startup pass. Earlier systems have already attached.
    fn on_attach(&mut self, locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        Ok(())
    }

    /// Second startup pass. Every system has attached.
    fn on_finalize(&mut self, locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        Ok(())
    }

    /// Called once when continuous frame dispatch is about to begin.
    fn on_run_engine(&mut self, locator: &mut Locator<'_>) {}

    fn on_pre_frame(&mut self, locator: &mut Locator<'_>) {}

    fn on_begin_frame(&mut self, locator: &mut Locator<'_>) {}

    fn on_process_frame(&mut self, locator: &mut Locator<'_>) {}

    fn on_end_frame(&mut self, locator: &mut Locator<'_>) {}

    fn on_post_frame(&mut self, locator: &mut Locator<'_>) {}

    /// Polled once per frame after the phases ran. Any `true` ends the run.
    fn is_requesting_exit(&self) -> bool {
        false
    }
}
