use crate::context::StorageContext;
use crate::locator::Locator;
use crate::system::{System, SystemResult};
use crate::systems::TimeSystem;

/// Requests exit once a fixed number of frames has been dispatched.
///
/// The limit comes from the constructor or the `engine.max_frames` config
/// var (the config var wins). Without either it never requests exit.
#[derive(Debug, Default)]
pub struct FrameLimit {
    max_frames: Option<u64>,
    frames: u64,
}

impl FrameLimit {
    pub const MAX_FRAMES_KEY: &'static str = "engine.max_frames";

    /// A limit read from config at attach time.
    pub fn new() -> Self {
        Self::default()
    }

    /// A limit of `max_frames` unless config overrides it.
    pub fn with_max_frames(max_frames: u64) -> Self {
        Self {
            max_frames: Some(max_frames),
            frames: 0,
        }
    }

    pub fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    /// Frames counted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl System for FrameLimit {
    fn name(&self) -> &'static str {
        "FrameLimit"
    }

    fn on_attach(&mut self, _locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        if let Some(max_frames) = context.var::<u64>(Self::MAX_FRAMES_KEY)? {
            self.max_frames = Some(max_frames);
        }
        match self.max_frames {
            Some(max) => tracing::debug!("FrameLimit: stopping after {} frames", max),
            None => tracing::debug!("FrameLimit: no limit configured"),
        }
        Ok(())
    }

    fn on_end_frame(&mut self, locator: &mut Locator<'_>) {
        self.frames += 1;
        if self.max_frames != Some(self.frames) {
            return;
        }

        // The clock is optional; it only enriches the log line.
        match locator.locate::<TimeSystem>() {
            Ok(time) => tracing::info!(
                "Frame limit of {} reached after {:.3}s",
                self.frames,
                time.elapsed_seconds()
            ),
            Err(_) => tracing::info!("Frame limit of {} reached", self.frames),
        }
    }

    fn is_requesting_exit(&self) -> bool {
        self.max_frames.is_some_and(|max| self.frames >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StorageContext, SystemStorage};
    use orrery_core::ConfigVars;

    fn run_until_exit(storage: &mut SystemStorage, cap: u64) -> u64 {
        for _ in 0..cap {
            if storage.dispatch_frame().unwrap().exit_requested {
                break;
            }
        }
        storage.frame_count()
    }

    #[test]
    fn test_limit_from_config() {
        let mut storage = SystemStorage::new(StorageContext::new(ConfigVars::from_pairs([(
            FrameLimit::MAX_FRAMES_KEY,
            "3",
        )])));
        storage.register(TimeSystem::new()).unwrap();
        storage.register(FrameLimit::new()).unwrap();
        storage.start().unwrap();

        assert_eq!(run_until_exit(&mut storage, 10), 3);
        assert_eq!(storage.get::<FrameLimit>().unwrap().frames(), 3);
    }

    #[test]
    fn test_config_overrides_constructor() {
        let mut storage = SystemStorage::new(StorageContext::new(ConfigVars::from_pairs([(
            FrameLimit::MAX_FRAMES_KEY,
            "2",
        )])));
        storage.register(FrameLimit::with_max_frames(8)).unwrap();
        storage.start().unwrap();

        assert_eq!(storage.get::<FrameLimit>().unwrap().max_frames(), Some(2));
    }

    #[test]
    fn test_without_clock() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(FrameLimit::with_max_frames(1)).unwrap();
        storage.start().unwrap();

        assert_eq!(run_until_exit(&mut storage, 10), 1);
    }

    #[test]
    fn test_no_limit_never_exits() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(FrameLimit::new()).unwrap();
        storage.start().unwrap();

        assert_eq!(run_until_exit(&mut storage, 25), 25);
        assert!(!storage.is_requesting_exit());
    }
}
