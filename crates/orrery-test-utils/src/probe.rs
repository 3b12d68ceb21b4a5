//! Configurable recording system.

use std::marker::PhantomData;

use orrery::{FramePhase, Locator, StorageContext, System, SystemResult};

use crate::journal::{Hook, Journal};

type StartupHook = Box<dyn FnMut(&mut Locator<'_>, &StorageContext) -> SystemResult>;
type FrameHook = Box<dyn FnMut(FramePhase, &mut Locator<'_>)>;

/// A [`System`] that journals every callback it receives.
///
/// The marker `M` only gives each probe a distinct type, so several probes
/// can live in one storage:
///
/// ```rust
/// use orrery_test_utils::{Journal, Probe};
///
/// struct Audio;
/// struct Input;
///
/// let journal = Journal::new();
/// let audio = Probe::<Audio>::new("audio", &journal).failing_attach();
/// let input = Probe::<Input>::new("input", &journal).exit_on_frame(3);
/// # let _ = (audio, input);
/// ```
pub struct Probe<M: 'static> {
    label: &'static str,
    journal: Journal,
    fail_attach: bool,
    fail_finalize: bool,
    exit_on_frame: Option<u64>,
    frames: u64,
    attach_hook: Option<StartupHook>,
    finalize_hook: Option<StartupHook>,
    frame_hook: Option<FrameHook>,
    _marker: PhantomData<fn() -> M>,
}

impl<M: 'static> Probe<M> {
    pub fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: journal.clone(),
            fail_attach: false,
            fail_finalize: false,
            exit_on_frame: None,
            frames: 0,
            attach_hook: None,
            finalize_hook: None,
            frame_hook: None,
            _marker: PhantomData,
        }
    }

    /// Refuse to attach (after journaling the call).
    pub fn failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    /// Refuse to finalize (after journaling the call).
    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    /// Request exit from frame `frame` (1-based) onwards.
    pub fn exit_on_frame(mut self, frame: u64) -> Self {
        self.exit_on_frame = Some(frame);
        self
    }

    /// Run `hook` during attach; its error becomes the attach result.
    pub fn on_attach(
        mut self,
        hook: impl FnMut(&mut Locator<'_>, &StorageContext) -> SystemResult + 'static,
    ) -> Self {
        self.attach_hook = Some(Box::new(hook));
        self
    }

    /// Run `hook` during finalize; its error becomes the finalize result.
    pub fn on_finalize(
        mut self,
        hook: impl FnMut(&mut Locator<'_>, &StorageContext) -> SystemResult + 'static,
    ) -> Self {
        self.finalize_hook = Some(Box::new(hook));
        self
    }

    /// Run `hook` in every frame phase.
    pub fn on_frame(mut self, hook: impl FnMut(FramePhase, &mut Locator<'_>) + 'static) -> Self {
        self.frame_hook = Some(Box::new(hook));
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Frames this probe has seen, counted in the post-frame phase.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn phase(&mut self, phase: FramePhase, locator: &mut Locator<'_>) {
        self.journal.record(self.label, Hook::Phase(phase));
        if let Some(hook) = self.frame_hook.as_mut() {
            hook(phase, locator);
        }
    }
}

impl<M: 'static> System for Probe<M> {
    fn name(&self) -> &'static str {
        self.label
    }

    fn on_attach(&mut self, locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        self.journal.record(self.label, Hook::Attach);
        if let Some(hook) = self.attach_hook.as_mut() {
            hook(locator, context)?;
        }
        if self.fail_attach {
            return Err(format!("{} refused to attach", self.label).into());
        }
        Ok(())
    }

    fn on_finalize(&mut self, locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        self.journal.record(self.label, Hook::Finalize);
        if let Some(hook) = self.finalize_hook.as_mut() {
            hook(locator, context)?;
        }
        if self.fail_finalize {
            return Err(format!("{} refused to finalize", self.label).into());
        }
        Ok(())
    }

    fn on_run_engine(&mut self, _locator: &mut Locator<'_>) {
        self.journal.record(self.label, Hook::RunEngine);
    }

    fn on_pre_frame(&mut self, locator: &mut Locator<'_>) {
        self.phase(FramePhase::PreFrame, locator);
    }

    fn on_begin_frame(&mut self, locator: &mut Locator<'_>) {
        self.phase(FramePhase::BeginFrame, locator);
    }

    fn on_process_frame(&mut self, locator: &mut Locator<'_>) {
        self.phase(FramePhase::ProcessFrame, locator);
    }

    fn on_end_frame(&mut self, locator: &mut Locator<'_>) {
        self.phase(FramePhase::EndFrame, locator);
    }

    fn on_post_frame(&mut self, locator: &mut Locator<'_>) {
        self.phase(FramePhase::PostFrame, locator);
        self.frames += 1;
    }

    fn is_requesting_exit(&self) -> bool {
        self.journal.record(self.label, Hook::ExitPoll);
        self.exit_on_frame.is_some_and(|frame| self.frames >= frame)
    }
}

impl<M: 'static> Drop for Probe<M> {
    fn drop(&mut self) {
        self.journal.record(self.label, Hook::Drop);
    }
}
