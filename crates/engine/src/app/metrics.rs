use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

/// Host loop figures published once per metrics interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    /// Moving average kept by the simulation loop.
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    /// Total since the loop started.
    pub panic_count: u64,
    pub tick: u64,
    pub actor_count: usize,
}

/// Shared read side of the loop metrics; cheap to clone into other threads.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        *self.latest.read().unwrap_or_else(|poisoned| {
            warn!("metrics_lock_poisoned");
            poisoned.into_inner()
        })
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        *latest = snapshot;
    }
}

/// World-side figures sampled when an interval closes.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WorldSample {
    pub(crate) tick: u64,
    pub(crate) actor_count: usize,
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    opened_at: Instant,
    frames: u32,
    ticks: u32,
    busy: Duration,
    panics: u64,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            opened_at: Instant::now(),
            frames: 0,
            ticks: 0,
            busy: Duration::ZERO,
            panics: 0,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.busy = self.busy.saturating_add(frame_dt);
    }

    pub(crate) fn record_ticks(&mut self, ticks: u32) {
        self.ticks = self.ticks.saturating_add(ticks);
    }

    pub(crate) fn record_panic(&mut self) {
        self.panics = self.panics.saturating_add(1);
    }

    /// Closes the interval once it has run its length and starts the next.
    pub(crate) fn maybe_snapshot(
        &mut self,
        now: Instant,
        smoothed_fps: f32,
        world: WorldSample,
    ) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.opened_at);
        if elapsed < self.interval {
            return None;
        }

        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.busy.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: smoothed_fps,
            tps: self.ticks as f32 / elapsed.as_secs_f32().max(f32::EPSILON),
            frame_time_ms,
            panic_count: self.panics,
            tick: world.tick,
            actor_count: world.actor_count,
        };

        self.opened_at = now;
        self.frames = 0;
        self.ticks = 0;
        self.busy = Duration::ZERO;
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const SAMPLE: WorldSample = WorldSample {
        tick: 120,
        actor_count: 5,
    };

    #[test]
    fn interval_snapshot_averages_frames_and_counts_ticks() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let opened = accumulator.opened_at;
        accumulator.record_frame(Duration::from_millis(10));
        accumulator.record_frame(Duration::from_millis(20));
        accumulator.record_ticks(60);
        accumulator.record_panic();

        assert!(accumulator
            .maybe_snapshot(opened + Duration::from_millis(500), 60.0, SAMPLE)
            .is_none());

        let snapshot = accumulator
            .maybe_snapshot(opened + Duration::from_secs(1), 59.5, SAMPLE)
            .expect("interval closed");
        assert_eq!(snapshot.fps, 59.5);
        assert!((snapshot.tps - 60.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 15.0).abs() < 0.001);
        assert_eq!((snapshot.tick, snapshot.actor_count), (120, 5));

        let quiet = accumulator
            .maybe_snapshot(opened + Duration::from_secs(3), 0.0, WorldSample::default())
            .expect("second interval");
        assert_eq!(quiet.tps, 0.0);
        assert_eq!(quiet.frame_time_ms, 0.0);
        assert_eq!(quiet.panic_count, 1);
    }

    #[test]
    fn handle_survives_a_poisoned_lock() {
        let handle = MetricsHandle::default();
        let shared = handle.clone();
        let _ = thread::spawn(move || {
            let _guard = shared.latest.write().expect("write guard");
            panic!("poison metrics lock");
        })
        .join();

        assert_eq!(handle.snapshot(), LoopMetricsSnapshot::default());
        let published = LoopMetricsSnapshot {
            fps: 30.0,
            panic_count: 2,
            ..LoopMetricsSnapshot::default()
        };
        handle.publish(published);
        assert_eq!(handle.snapshot(), published);
    }
}
