use std::time::Duration;

use tracing::{debug, info, warn};

use super::clock::{FpsMeter, TickClock};
use super::config::SimConfig;
use super::{Drawable, Steppable};

/// Handle for one outstanding host frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// The host side of the loop: something that will call
/// [`SimulationLoop::advance_frame`] again later.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Outcome of one host frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    pub panicked: bool,
    pub dropped_backlog: Duration,
    pub interpolation: f32,
    pub fps: f32,
}

/// Fixed-step driver invoked from a variable-rate host callback.
pub struct SimulationLoop<S> {
    scheduler: S,
    clock: TickClock,
    fps: FpsMeter,
    min_frame_interval: Duration,
    last_timestamp: Option<Duration>,
    pending: Option<FrameRequest>,
    running: bool,
}

impl<S: FrameScheduler> SimulationLoop<S> {
    pub fn new(config: &SimConfig, scheduler: S) -> Self {
        Self {
            scheduler,
            clock: TickClock::from_config(config),
            fps: FpsMeter::from_config(config),
            min_frame_interval: config.min_frame_interval(),
            last_timestamp: None,
            pending: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn pending_request(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Asks the host for the first frame. Returns `false` if already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_timestamp = None;
        self.pending = Some(self.scheduler.request_frame());
        info!(
            step_ms = self.clock.step().as_secs_f64() * 1000.0,
            bound = self.clock.bound(),
            "sim_loop_started"
        );
        true
    }

    /// Cancels the outstanding frame request. Simulation state is left as is.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        if let Some(request) = self.pending.take() {
            self.scheduler.cancel_frame(request);
        }
        info!(total_steps = self.clock.total_steps(), "sim_loop_stopped");
        true
    }

    /// One host frame at `timestamp` (monotonic, measured from any fixed
    /// origin). Runs the due fixed steps, then draws with the leftover
    /// fraction of a step. Returns `None` when nothing was drawn.
    pub fn advance_frame<W>(&mut self, timestamp: Duration, sim: &mut W) -> Option<FrameReport>
    where
        W: Steppable + Drawable,
    {
        if !self.running {
            return None;
        }
        self.pending = Some(self.scheduler.request_frame());

        let Some(last) = self.last_timestamp else {
            self.last_timestamp = Some(timestamp);
            self.fps.record_frame(timestamp);
            sim.draw(1.0);
            return Some(FrameReport {
                steps: 0,
                panicked: false,
                dropped_backlog: Duration::ZERO,
                interpolation: 1.0,
                fps: self.fps.fps(),
            });
        };

        let elapsed = timestamp.saturating_sub(last);
        if elapsed < self.min_frame_interval {
            return None;
        }
        self.last_timestamp = Some(timestamp);

        let plan = self.clock.advance(elapsed);
        let step = self.clock.step();
        for _ in 0..plan.steps {
            sim.step(step);
        }
        if plan.panicked {
            warn!(
                steps = plan.steps,
                dropped_backlog_ms = plan.dropped_backlog.as_secs_f64() * 1000.0,
                panic_count = self.clock.panic_count(),
                "sim_panic"
            );
        }

        let interpolation = self.clock.interpolation();
        sim.draw(interpolation);
        if let Some(fps) = self.fps.record_frame(timestamp) {
            debug!(fps, "fps_refreshed");
        }

        Some(FrameReport {
            steps: plan.steps,
            panicked: plan.panicked,
            dropped_backlog: plan.dropped_backlog,
            interpolation,
            fps: self.fps.fps(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingScheduler {
        next: u64,
        requested: Vec<FrameRequest>,
        cancelled: Vec<FrameRequest>,
    }

    impl FrameScheduler for RecordingScheduler {
        fn request_frame(&mut self) -> FrameRequest {
            self.next += 1;
            let request = FrameRequest(self.next);
            self.requested.push(request);
            request
        }

        fn cancel_frame(&mut self, request: FrameRequest) {
            self.cancelled.push(request);
        }
    }

    #[derive(Default)]
    struct CountingSim {
        steps: u32,
        draws: Vec<f32>,
    }

    impl Steppable for CountingSim {
        fn step(&mut self, _step: Duration) {
            self.steps += 1;
        }
    }

    impl Drawable for CountingSim {
        fn draw(&mut self, interpolation: f32) {
            self.draws.push(interpolation);
        }
    }

    fn config() -> SimConfig {
        SimConfig {
            target_tps: 50,
            ..SimConfig::default()
        }
    }

    #[test]
    fn start_twice_is_a_no_op_and_stop_cancels_pending_request() {
        let mut sim_loop = SimulationLoop::new(&config(), RecordingScheduler::default());
        assert!(sim_loop.start());
        assert!(!sim_loop.start());
        assert_eq!(sim_loop.scheduler().requested.len(), 1);

        assert!(sim_loop.stop());
        assert_eq!(sim_loop.scheduler().cancelled, vec![FrameRequest(1)]);
        assert_eq!(sim_loop.pending_request(), None);
        assert!(!sim_loop.stop());

        let mut sim = CountingSim::default();
        assert!(sim_loop
            .advance_frame(Duration::from_millis(100), &mut sim)
            .is_none());
        assert!(sim.draws.is_empty());
    }

    #[test]
    fn frames_run_fixed_steps_and_report_interpolation() {
        let mut sim_loop = SimulationLoop::new(&config(), RecordingScheduler::default());
        let mut sim = CountingSim::default();
        sim_loop.start();

        let first = sim_loop
            .advance_frame(Duration::from_millis(1_000), &mut sim)
            .expect("baseline frame");
        assert_eq!(first.steps, 0);
        assert_eq!(sim.draws, vec![1.0]);

        let report = sim_loop
            .advance_frame(Duration::from_millis(1_050), &mut sim)
            .expect("frame");
        assert_eq!(report.steps, 2);
        assert!(!report.panicked);
        assert!((report.interpolation - 0.5).abs() < 1.0e-4);
        assert_eq!(sim.steps, 2);
        assert_eq!(sim_loop.scheduler().requested.len(), 3);
    }

    #[test]
    fn long_stall_panics_and_discards_backlog() {
        let mut sim_loop = SimulationLoop::new(&config(), RecordingScheduler::default());
        let mut sim = CountingSim::default();
        sim_loop.start();
        sim_loop.advance_frame(Duration::ZERO, &mut sim);

        let report = sim_loop
            .advance_frame(Duration::from_secs(60), &mut sim)
            .expect("frame");
        assert_eq!(report.steps, 240);
        assert!(report.panicked);
        assert_eq!(sim.steps, 240);
        assert_eq!(sim_loop.clock().accumulator(), Duration::ZERO);

        let report = sim_loop
            .advance_frame(Duration::from_millis(60_020), &mut sim)
            .expect("frame");
        assert_eq!(report.steps, 1);
        assert!(!report.panicked);
    }

    #[test]
    fn frames_below_min_interval_skip_but_reschedule() {
        let config = SimConfig {
            target_tps: 50,
            min_frame_interval_ms: 30,
            ..SimConfig::default()
        };
        let mut sim_loop = SimulationLoop::new(&config, RecordingScheduler::default());
        let mut sim = CountingSim::default();
        sim_loop.start();
        sim_loop.advance_frame(Duration::ZERO, &mut sim);

        assert!(sim_loop
            .advance_frame(Duration::from_millis(10), &mut sim)
            .is_none());
        assert_eq!(sim_loop.scheduler().requested.len(), 3);
        assert_eq!(sim.draws.len(), 1);

        let report = sim_loop
            .advance_frame(Duration::from_millis(40), &mut sim)
            .expect("frame");
        assert_eq!(report.steps, 2);
    }
}
