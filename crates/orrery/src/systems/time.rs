use std::time::{Duration, Instant};

use orrery_core::profiling::profile_function;

use crate::context::StorageContext;
use crate::locator::Locator;
use crate::system::{System, SystemResult};

/// Frame clock.
///
/// Provides delta time, elapsed time, frame counting, time scaling and a
/// fixed-timestep accumulator. The clock is read in
/// [`on_pre_frame`](System::on_pre_frame), so any system registered after it
/// sees the current frame's timing from `on_pre_frame` onwards.
///
/// # Config vars
///
/// - `time.max_delta_ms` (default 100): cap on a single frame's delta.
/// - `time.fixed_timestep_ms` (default 20): fixed step length.
/// - `time.scale` (default 1.0): initial time scale.
///
/// # Example
/// ```ignore
/// fn on_process_frame(&mut self, locator: &mut Locator<'_>) {
///     if let Ok(time) = locator.locate::<TimeSystem>() {
///         self.position += self.velocity * time.delta_seconds();
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TimeSystem {
    elapsed: Duration,
    delta: Duration,
    frame_count: u64,
    time_scale: f32,
    fixed_timestep: Duration,
    fixed_accumulator: Duration,
    /// Prevents a single long frame from snowballing into the next ones.
    max_delta: Duration,
    start_time: Instant,
    last_frame_time: Instant,
}

impl TimeSystem {
    pub const MAX_DELTA_KEY: &'static str = "time.max_delta_ms";
    pub const FIXED_TIMESTEP_KEY: &'static str = "time.fixed_timestep_ms";
    pub const SCALE_KEY: &'static str = "time.scale";

    /// Most fixed updates reported for one frame.
    pub const MAX_FIXED_UPDATES: usize = 5;

    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            frame_count: 0,
            time_scale: 1.0,
            fixed_timestep: Duration::from_millis(20),
            fixed_accumulator: Duration::ZERO,
            max_delta: Duration::from_millis(100),
            start_time: now,
            last_frame_time: now,
        }
    }

    /// Restart the clock from `now`, keeping configuration.
    pub fn reset_baseline(&mut self, now: Instant) {
        self.elapsed = Duration::ZERO;
        self.delta = Duration::ZERO;
        self.frame_count = 0;
        self.fixed_accumulator = Duration::ZERO;
        self.start_time = now;
        self.last_frame_time = now;
    }

    /// Advance the clock to `now`.
    pub fn advance(&mut self, now: Instant) {
        profile_function!();
        let raw_delta = now.saturating_duration_since(self.last_frame_time);

        self.delta = raw_delta.min(self.max_delta);
        self.elapsed = now.saturating_duration_since(self.start_time);
        self.last_frame_time = now;
        self.frame_count += 1;
        self.fixed_accumulator += self.delta;
    }

    #[inline]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Scaled delta in seconds; what gameplay code should integrate with.
    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32() * self.time_scale
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[inline]
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Frames since the engine started running.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Negative scales clamp to 0 (paused).
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }

    #[inline]
    pub fn fixed_timestep(&self) -> Duration {
        self.fixed_timestep
    }

    pub fn set_fixed_timestep(&mut self, timestep: Duration) {
        self.fixed_timestep = timestep;
    }

    #[inline]
    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }

    pub fn set_max_delta(&mut self, max_delta: Duration) {
        self.max_delta = max_delta;
    }

    /// Number of fixed steps owed this frame, capped at [`Self::MAX_FIXED_UPDATES`].
    pub fn fixed_update_count(&self) -> usize {
        if self.fixed_timestep.is_zero() {
            return 0;
        }
        let count = self.fixed_accumulator.as_nanos() / self.fixed_timestep.as_nanos();
        count.min(Self::MAX_FIXED_UPDATES as u128) as usize
    }

    /// Take one fixed step out of the accumulator. Returns false if none was owed.
    pub fn consume_fixed_timestep(&mut self) -> bool {
        if !self.fixed_timestep.is_zero() && self.fixed_accumulator >= self.fixed_timestep {
            self.fixed_accumulator -= self.fixed_timestep;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn start_time(&self) -> Instant {
        self.start_time
    }
}

impl Default for TimeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TimeSystem {
    fn name(&self) -> &'static str {
        "TimeSystem"
    }

    fn on_attach(&mut self, _locator: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        if let Some(ms) = context.var::<u64>(Self::MAX_DELTA_KEY)? {
            self.max_delta = Duration::from_millis(ms);
        }
        if let Some(ms) = context.var::<u64>(Self::FIXED_TIMESTEP_KEY)? {
            if ms == 0 {
                return Err(format!("{} must be greater than zero", Self::FIXED_TIMESTEP_KEY).into());
            }
            self.fixed_timestep = Duration::from_millis(ms);
        }
        if let Some(scale) = context.var::<f32>(Self::SCALE_KEY)? {
            self.set_time_scale(scale);
        }

        tracing::debug!(
            "TimeSystem: max delta {:?}, fixed timestep {:?}",
            self.max_delta,
            self.fixed_timestep
        );
        Ok(())
    }

    fn on_run_engine(&mut self, _locator: &mut Locator<'_>) {
        self.reset_baseline(Instant::now());
    }

    fn on_pre_frame(&mut self, _locator: &mut Locator<'_>) {
        self.advance(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StorageContext, SystemStorage};
    use orrery_core::ConfigVars;

    #[test]
    fn test_time_creation() {
        let time = TimeSystem::new();
        assert_eq!(time.frame_count(), 0);
        assert_eq!(time.elapsed(), Duration::ZERO);
        assert_eq!(time.delta(), Duration::ZERO);
        assert_eq!(time.time_scale(), 1.0);
        assert!(!time.is_paused());
    }

    #[test]
    fn test_advance() {
        let mut time = TimeSystem::new();
        let start = time.start_time();

        time.advance(start + Duration::from_millis(10));
        assert_eq!(time.frame_count(), 1);
        assert_eq!(time.delta(), Duration::from_millis(10));
        assert_eq!(time.elapsed(), Duration::from_millis(10));

        time.advance(start + Duration::from_millis(25));
        assert_eq!(time.frame_count(), 2);
        assert_eq!(time.delta(), Duration::from_millis(15));
    }

    #[test]
    fn test_max_delta_caps_long_frames() {
        let mut time = TimeSystem::new();
        time.set_max_delta(Duration::from_millis(50));

        time.advance(time.start_time() + Duration::from_millis(400));
        assert_eq!(time.delta(), Duration::from_millis(50));
        assert_eq!(time.elapsed(), Duration::from_millis(400));
    }

    #[test]
    fn test_time_scale() {
        let mut time = TimeSystem::new();
        time.advance(time.start_time() + Duration::from_millis(20));

        let normal_dt = time.delta_seconds();
        time.set_time_scale(0.5);
        assert!((time.delta_seconds() - normal_dt * 0.5).abs() < 1e-6);

        time.set_time_scale(-3.0);
        assert!(time.is_paused());
        assert_eq!(time.delta_seconds(), 0.0);
    }

    #[test]
    fn test_fixed_timestep() {
        let mut time = TimeSystem::new();
        time.set_fixed_timestep(Duration::from_millis(16));
        assert_eq!(time.fixed_update_count(), 0);

        time.advance(time.start_time() + Duration::from_millis(40));
        assert_eq!(time.fixed_update_count(), 2);

        assert!(time.consume_fixed_timestep());
        assert!(time.consume_fixed_timestep());
        assert!(!time.consume_fixed_timestep());
        assert_eq!(time.fixed_update_count(), 0);
    }

    #[test]
    fn test_fixed_updates_are_capped() {
        let mut time = TimeSystem::new();
        time.set_fixed_timestep(Duration::from_millis(1));
        time.advance(time.start_time() + Duration::from_millis(90));
        assert_eq!(time.fixed_update_count(), TimeSystem::MAX_FIXED_UPDATES);
    }

    #[test]
    fn test_huge_backlog_is_capped() {
        let mut time = TimeSystem::new();
        time.set_fixed_timestep(Duration::from_nanos(1));
        time.set_max_delta(Duration::MAX);

        // 2^64 owed steps, which wraps to zero when narrowed to a usize first.
        time.advance(time.start_time() + Duration::new(18_446_744_073, 709_551_616));
        assert_eq!(time.fixed_update_count(), TimeSystem::MAX_FIXED_UPDATES);
    }

    #[test]
    fn test_reset_baseline() {
        let mut time = TimeSystem::new();
        time.advance(time.start_time() + Duration::from_millis(30));

        let later = time.start_time() + Duration::from_secs(5);
        time.reset_baseline(later);
        assert_eq!(time.frame_count(), 0);
        assert_eq!(time.elapsed(), Duration::ZERO);
        assert_eq!(time.start_time(), later);
    }

    #[test]
    fn test_attach_reads_config() {
        let mut storage = SystemStorage::new(StorageContext::new(ConfigVars::from_pairs([
            (TimeSystem::MAX_DELTA_KEY, "250"),
            (TimeSystem::FIXED_TIMESTEP_KEY, "10"),
            (TimeSystem::SCALE_KEY, "2.0"),
        ])));
        storage.register(TimeSystem::new()).unwrap();
        storage.start().unwrap();

        let time = storage.get::<TimeSystem>().unwrap();
        assert_eq!(time.max_delta(), Duration::from_millis(250));
        assert_eq!(time.fixed_timestep(), Duration::from_millis(10));
        assert_eq!(time.time_scale(), 2.0);
    }

    #[test]
    fn test_attach_rejects_zero_timestep() {
        let mut storage = SystemStorage::new(StorageContext::new(ConfigVars::from_pairs([(
            TimeSystem::FIXED_TIMESTEP_KEY,
            "0",
        )])));
        storage.register(TimeSystem::new()).unwrap();
        assert!(storage.start().is_err());
    }

    #[test]
    fn test_frames_advance_the_clock() {
        let mut storage = SystemStorage::new(StorageContext::default());
        storage.register(TimeSystem::new()).unwrap();
        storage.start().unwrap();

        for _ in 0..3 {
            storage.dispatch_frame().unwrap();
        }
        assert_eq!(storage.get::<TimeSystem>().unwrap().frame_count(), 3);
    }
}
