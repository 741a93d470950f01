use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_MAX_STEPS_PER_FRAME: u32 = 240;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub target_tps: u32,
    pub max_steps_per_frame: u32,
    pub min_frame_interval_ms: u64,
    pub fps_update_interval_ms: u64,
    /// Weight of the newest sample in the fps moving average, in `(0, 1]`.
    pub fps_smoothing: f32,
    pub facing_debounce_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_steps_per_frame: DEFAULT_MAX_STEPS_PER_FRAME,
            min_frame_interval_ms: 0,
            fps_update_interval_ms: 1000,
            fps_smoothing: 0.25,
            facing_debounce_ticks: 6,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SimConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_tps.max(1) as f64)
    }

    pub fn step_bound(&self) -> u32 {
        self.max_steps_per_frame.max(1)
    }

    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_millis(self.min_frame_interval_ms)
    }

    pub fn fps_update_interval(&self) -> Duration {
        Duration::from_millis(self.fps_update_interval_ms)
    }

    pub fn fps_alpha(&self) -> f32 {
        if self.fps_smoothing.is_finite() {
            self.fps_smoothing.clamp(f32::EPSILON, 1.0)
        } else {
            1.0
        }
    }
}
