use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::{ContentCompileError, StartupError, WorldLoadError};

use super::metrics::MetricsAccumulator;
use super::{InputScriptError, InputSource, MetricsHandle, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    /// Stop after this many ticks even if input remains.
    pub max_ticks: Option<u64>,
    /// Pace ticks against the wall clock instead of running as fast as possible.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            realtime: false,
        }
    }
}

impl LoopConfig {
    pub fn fixed_dt_seconds(&self) -> f32 {
        fixed_dt(self.target_tps).as_secs_f32()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to compile content definitions: {0}")]
    Content(#[from] ContentCompileError),
    #[error("failed to load world definition: {0}")]
    World(#[from] WorldLoadError),
    #[error("failed to load input script: {0}")]
    InputScript(#[from] InputScriptError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    InputExhausted { ticks: u64 },
    QuitRequested { ticks: u64 },
    TickLimitReached { ticks: u64 },
}

impl LoopOutcome {
    pub fn ticks(self) -> u64 {
        match self {
            Self::InputExhausted { ticks }
            | Self::QuitRequested { ticks }
            | Self::TickLimitReached { ticks } => ticks,
        }
    }
}

pub fn run_app(
    config: LoopConfig,
    scene: &mut dyn Scene,
    input: &mut dyn InputSource,
) -> LoopOutcome {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, scene, input, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    scene: &mut dyn Scene,
    input: &mut dyn InputSource,
    metrics_handle: MetricsHandle,
) -> LoopOutcome {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = fixed_dt(target_tps);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        realtime = config.realtime,
        "loop_config"
    );

    scene.load();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_title: Option<String> = None;

    let outcome = 'frames: loop {
        let ticks_to_run = if config.realtime {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator =
                accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            step_plan.ticks_to_run
        } else {
            1
        };

        for _ in 0..ticks_to_run {
            let ticks = metrics_accumulator.total_ticks();
            if config.max_ticks.is_some_and(|limit| ticks >= limit) {
                break 'frames LoopOutcome::TickLimitReached { ticks };
            }
            let Some(snapshot) = input.next_snapshot() else {
                break 'frames LoopOutcome::InputExhausted { ticks };
            };

            let tick_start = Instant::now();
            let command = scene.update(fixed_dt_seconds, &snapshot);
            metrics_accumulator.record_tick(tick_start.elapsed());

            if matches!(command, SceneCommand::Quit) || snapshot.quit_requested() {
                break 'frames LoopOutcome::QuitRequested {
                    ticks: metrics_accumulator.total_ticks(),
                };
            }
        }

        let title = scene.debug_title();
        if title != last_title {
            if let Some(title) = &title {
                info!(title = %title, "scene_title_changed");
            }
            last_title = title;
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                total_ticks = snapshot.total_ticks,
                "loop_metrics"
            );
        }

        if config.realtime {
            thread::sleep(fixed_dt.saturating_sub(accumulator));
        }
    };

    scene.unload();
    info!(outcome = ?outcome, "shutdown");
    outcome
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        accumulator = Duration::ZERO;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn fixed_dt(target_tps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / target_tps.max(1) as f64)
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
