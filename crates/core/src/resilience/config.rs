//! Configuration for circuit breaking.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Failure ratio at or above which a closed breaker opens.
    #[serde(default = "default_failure_ratio")]
    pub failure_ratio: f64,

    /// Minimum number of recorded attempts before the ratio is evaluated.
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: usize,

    /// Number of most recent attempts kept in the rolling window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Cool-down before an open breaker admits a trial attempt, in milliseconds.
    #[serde(default = "default_open_delay_ms")]
    pub open_delay_ms: u64,
}

fn default_failure_ratio() -> f64 {
    0.6
}

fn default_volume_threshold() -> usize {
    10
}

fn default_window_size() -> usize {
    10
}

fn default_open_delay_ms() -> u64 {
    10_000
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_ratio: default_failure_ratio(),
            volume_threshold: default_volume_threshold(),
            window_size: default_window_size(),
            open_delay_ms: default_open_delay_ms(),
        }
    }
}

impl CircuitConfig {
    pub fn open_delay(&self) -> Duration {
        Duration::from_millis(self.open_delay_ms)
    }
}
