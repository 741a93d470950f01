use std::time::Duration;

use super::config::SimConfig;

/// How many fixed steps one frame runs and what is left afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPlan {
    pub steps: u32,
    pub remaining: Duration,
    pub dropped_backlog: Duration,
    pub panicked: bool,
}

/// Drains `accumulator` in `step`-sized slices, at most `bound` of them.
/// Reaching the bound is a panic: whatever time is still accumulated is
/// dropped instead of carried into the next frame.
pub fn plan_steps(mut accumulator: Duration, step: Duration, bound: u32) -> StepPlan {
    let bound = bound.max(1);
    let mut steps = 0u32;

    while accumulator >= step && !step.is_zero() {
        accumulator = accumulator.saturating_sub(step);
        steps = steps.saturating_add(1);
        if steps >= bound {
            return StepPlan {
                steps,
                remaining: Duration::ZERO,
                dropped_backlog: accumulator,
                panicked: true,
            };
        }
    }

    StepPlan {
        steps,
        remaining: accumulator,
        dropped_backlog: Duration::ZERO,
        panicked: false,
    }
}

/// Fixed-step accumulator owned by the simulation loop.
#[derive(Debug, Clone)]
pub struct TickClock {
    step: Duration,
    bound: u32,
    accumulator: Duration,
    steps_this_frame: u32,
    panic: bool,
    panic_count: u64,
    total_steps: u64,
}

impl TickClock {
    pub fn new(step: Duration, bound: u32) -> Self {
        Self {
            step: if step.is_zero() {
                Duration::from_nanos(1)
            } else {
                step
            },
            bound: bound.max(1),
            accumulator: Duration::ZERO,
            steps_this_frame: 0,
            panic: false,
            panic_count: 0,
            total_steps: 0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.fixed_step(), config.step_bound())
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn bound(&self) -> u32 {
        self.bound
    }

    pub fn accumulator(&self) -> Duration {
        self.accumulator
    }

    /// Steps planned by the most recent [`TickClock::advance`].
    pub fn steps_this_frame(&self) -> u32 {
        self.steps_this_frame
    }

    /// Whether the most recent frame hit the step bound.
    pub fn panicked(&self) -> bool {
        self.panic
    }

    pub fn panic_count(&self) -> u64 {
        self.panic_count
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Adds `elapsed` and plans this frame's steps. The caller runs exactly
    /// `plan.steps` ticks.
    pub fn advance(&mut self, elapsed: Duration) -> StepPlan {
        self.steps_this_frame = 0;
        self.panic = false;

        let plan = plan_steps(
            self.accumulator.saturating_add(elapsed),
            self.step,
            self.bound,
        );
        self.accumulator = plan.remaining;
        self.steps_this_frame = plan.steps;
        self.total_steps = self.total_steps.saturating_add(u64::from(plan.steps));
        if plan.panicked {
            self.panic = true;
            self.panic_count = self.panic_count.saturating_add(1);
        }
        plan
    }

    /// Fraction of a step left in the accumulator, in `[0, 1)`.
    pub fn interpolation(&self) -> f32 {
        (self.accumulator.as_secs_f64() / self.step.as_secs_f64()).clamp(0.0, 1.0) as f32
    }
}

/// Frames-per-second as an exponential moving average, refreshed once per
/// interval instead of every frame.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    fps: f32,
    alpha: f32,
    interval: Duration,
    window_start: Option<Duration>,
    frames: u32,
}

impl FpsMeter {
    pub fn new(initial_fps: f32, alpha: f32, interval: Duration) -> Self {
        Self {
            fps: initial_fps.max(0.0),
            alpha: alpha.clamp(0.0, 1.0),
            interval: if interval.is_zero() {
                Duration::from_millis(1)
            } else {
                interval
            },
            window_start: None,
            frames: 0,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(
            config.target_tps as f32,
            config.fps_alpha(),
            config.fps_update_interval(),
        )
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Counts a frame at `timestamp`. Returns the new average when the
    /// interval rolled over.
    pub fn record_frame(&mut self, timestamp: Duration) -> Option<f32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(timestamp);
            self.frames = 1;
            return None;
        };

        let elapsed = timestamp.saturating_sub(start);
        let refreshed = if elapsed >= self.interval {
            let measured = self.frames as f32 / elapsed.as_secs_f32().max(f32::EPSILON);
            self.fps = self.alpha * measured + (1.0 - self.alpha) * self.fps;
            self.window_start = Some(timestamp);
            self.frames = 0;
            Some(self.fps)
        } else {
            None
        };
        self.frames = self.frames.saturating_add(1);
        refreshed
    }
}
