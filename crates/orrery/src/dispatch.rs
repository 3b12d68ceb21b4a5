//! Per-frame phase dispatch and exit aggregation.

use std::fmt;

use orrery_core::profiling::{profile_function, profile_scope};

use crate::error::{RegistryError, RegistryResult};
use crate::locator::Locator;
use crate::storage::{LifecycleState, SystemStorage};
use crate::system::System;

/// The per-frame callback points, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FramePhase {
    PreFrame,
    BeginFrame,
    ProcessFrame,
    EndFrame,
    PostFrame,
}

impl FramePhase {
    /// Every phase, in dispatch order.
    pub const ALL: [FramePhase; 5] = [
        FramePhase::PreFrame,
        FramePhase::BeginFrame,
        FramePhase::ProcessFrame,
        FramePhase::EndFrame,
        FramePhase::PostFrame,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FramePhase::PreFrame => "pre_frame",
            FramePhase::BeginFrame => "begin_frame",
            FramePhase::ProcessFrame => "process_frame",
            FramePhase::EndFrame => "end_frame",
            FramePhase::PostFrame => "post_frame",
        }
    }

    /// Call this phase's hook on `system`.
    pub fn invoke(self, system: &mut dyn System, locator: &mut Locator<'_>) {
        match self {
            FramePhase::PreFrame => system.on_pre_frame(locator),
            FramePhase::BeginFrame => system.on_begin_frame(locator),
            FramePhase::ProcessFrame => system.on_process_frame(locator),
            FramePhase::EndFrame => system.on_end_frame(locator),
            FramePhase::PostFrame => system.on_post_frame(locator),
        }
    }
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a dispatched frame produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// 1-based number of the frame just dispatched.
    pub frame: u64,
    /// Whether any system asked to exit this frame.
    pub exit_requested: bool,
    /// Names of the systems that asked, in registration order.
    pub requested_by: Vec<&'static str>,
}

impl SystemStorage {
    /// Call [`on_run_engine`](System::on_run_engine) on every system.
    ///
    /// Legal once, after a successful [`start`](Self::start).
    /// [`dispatch_frame`](Self::dispatch_frame) calls it implicitly if the
    /// owner did not.
    pub fn run_engine(&mut self) -> RegistryResult<()> {
        self.require_state("run the engine", |state| state == LifecycleState::Ready)?;
        if self.engine_running {
            return Err(RegistryError::InvalidState {
                operation: "run the engine twice",
                state: self.state,
            });
        }

        self.engine_running = true;
        self.for_each(|system, locator| system.on_run_engine(locator));
        tracing::info!("Engine running with {} systems", self.len());
        Ok(())
    }

    /// Dispatch one frame: every phase, every system, then poll exit requests.
    ///
    /// Fails only with [`InvalidState`](RegistryError::InvalidState)
    /// when the storage is not [`Ready`](LifecycleState::Ready); the phase
    /// hooks themselves have no error channel.
    pub fn dispatch_frame(&mut self) -> RegistryResult<FrameOutcome> {
        profile_function!();
        self.require_state("dispatch a frame", |state| state == LifecycleState::Ready)?;
        if !self.engine_running {
            self.run_engine()?;
        }

        self.frame += 1;
        for phase in FramePhase::ALL {
            profile_scope!("frame_phase", phase.name());
            self.for_each(|system, locator| phase.invoke(system, locator));
        }

        let requested_by = self.exit_requesters();
        if !requested_by.is_empty() {
            tracing::info!(
                "Exit requested on frame {} by {:?}",
                self.frame,
                requested_by
            );
        }

        Ok(FrameOutcome {
            frame: self.frame,
            exit_requested: !requested_by.is_empty(),
            requested_by,
        })
    }

    /// Whether any system currently requests exit.
    pub fn is_requesting_exit(&self) -> bool {
        self.iter()
            .fold(false, |any, entry| entry.system().is_requesting_exit() || any)
    }

    fn exit_requesters(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|entry| entry.system().is_requesting_exit())
            .map(|entry| entry.name())
            .collect()
    }
}
