//! A headless engine loop built from a few systems.
//!
//! This example shows how to:
//! - Pass startup configuration as `key=value` arguments
//! - Register systems in dependency order
//! - Locate an earlier system during attach and during frames
//! - Stop the loop from a system
//!
//! Run with: cargo run -p orrery --example headless_loop -- engine.max_frames=120

use std::process::ExitCode;

use orrery::core::{Config, ConfigVars, logging};
use orrery::prelude::*;

/// Stand-in for a window: counts presented frames.
#[derive(Default)]
struct Window {
    presented: u64,
}

impl System for Window {
    fn on_attach(&mut self, _: &mut Locator<'_>, context: &StorageContext) -> SystemResult {
        let title: String = context.var_or("window.title", "Orrery".to_string())?;
        tracing::info!("Opening window '{}'", title);
        Ok(())
    }

    fn on_post_frame(&mut self, _: &mut Locator<'_>) {
        self.presented += 1;
    }
}

/// Moves a point with fixed steps from the clock.
#[derive(Default)]
struct Simulation {
    position: f32,
    steps: u64,
}

impl System for Simulation {
    fn on_attach(&mut self, locator: &mut Locator<'_>, _: &StorageContext) -> SystemResult {
        // Hard dependency: fails startup if the clock was not registered first.
        locator.locate::<TimeSystem>()?;
        Ok(())
    }

    fn on_finalize(&mut self, locator: &mut Locator<'_>, _: &StorageContext) -> SystemResult {
        if !locator.contains::<Window>() {
            tracing::warn!("Simulation running without a window");
        }
        Ok(())
    }

    fn on_process_frame(&mut self, locator: &mut Locator<'_>) {
        let Ok(time) = locator.locate_mut::<TimeSystem>() else {
            return;
        };
        let step = time.fixed_timestep().as_secs_f32();
        while time.consume_fixed_timestep() {
            self.position += 2.0 * step;
            self.steps += 1;
        }
    }
}

fn main() -> ExitCode {
    let mut vars = ConfigVars::from_pairs([("engine.max_frames", "60")]);
    vars.merge(ConfigVars::from_args(std::env::args().skip(1)));

    match Config::from_vars(&vars) {
        Ok(config) => logging::init_with_filter(&config.log_filter),
        Err(_) => logging::init(),
    }

    let engine = EngineBuilder::new()
        .with_config_vars(vars)
        .with_system(TimeSystem::new())
        .with_system(Window::default())
        .with_system(Simulation::default())
        .with_system(FrameLimit::new())
        .build();

    let mut engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to build engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match engine.run() {
        Ok(frames) => {
            if let (Ok(window), Ok(simulation)) = (engine.get::<Window>(), engine.get::<Simulation>()) {
                tracing::info!(
                    "Ran {} frames, presented {}, {} fixed steps, position {:.2}",
                    frames,
                    window.presented,
                    simulation.steps,
                    simulation.position
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Engine failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
