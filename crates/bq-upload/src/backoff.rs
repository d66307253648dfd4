//! Adaptive polling delay.
//!
//! Multiplicative increase/decrease with asymmetric factors (110% / 90%)
//! and hard bounds: the delay converges smoothly toward a sustainable
//! polling rate, while the floor bounds worst-case latency and the ceiling
//! bounds worst-case battery drain.

use crate::config::UploadConfig;

/// Factor applied after a successful upload.
const DECREASE_FACTOR: f64 = 0.90;

/// Factor applied after a failure or an empty poll.
const INCREASE_FACTOR: f64 = 1.10;

/// Self-tuning delay between upload runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadDelay {
    current_ms: u64,
    min_ms: u64,
    max_ms: u64,
}

impl UploadDelay {
    pub fn from_config(config: &UploadConfig) -> Self {
        UploadDelay {
            current_ms: config.initial_delay_ms(),
            min_ms: config.min_delay_ms(),
            max_ms: config.max_delay_ms(),
        }
    }

    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }

    /// Speed up polling: the channel is healthy and there may be a backlog.
    pub fn decrease(&mut self) {
        let next = (self.current_ms as f64 * DECREASE_FACTOR).round() as u64;
        self.current_ms = next.max(self.min_ms);
    }

    /// Back off: nothing to send, or the channel is unhealthy.
    pub fn increase(&mut self) {
        let next = (self.current_ms as f64 * INCREASE_FACTOR).round() as u64;
        self.current_ms = next.min(self.max_ms);
    }
}
