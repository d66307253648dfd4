//! Upload scheduling configuration.

use serde::{Deserialize, Serialize};

/// Preset base intervals for the upload schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadFrequency {
    /// Base interval of 1 second.
    Frequent,
    /// Base interval of 5 seconds.
    Average,
    /// Base interval of 10 seconds.
    Rare,
}

impl UploadFrequency {
    /// Base interval `B` the delay bounds derive from.
    pub fn base_interval_ms(&self) -> u64 {
        match self {
            UploadFrequency::Frequent => 1_000,
            UploadFrequency::Average => 5_000,
            UploadFrequency::Rare => 10_000,
        }
    }
}

/// Configuration for the upload scheduler.
///
/// The polling delay self-tunes between `min_delay_ms` (1×B) and
/// `max_delay_ms` (10×B), starting at `initial_delay_ms` (5×B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base interval in milliseconds.
    pub base_interval_ms: u64,

    /// Battery percentage below which uploads are deferred (unless charging
    /// or on external power).
    pub low_battery_threshold_percent: u8,
}

impl UploadConfig {
    pub fn new(frequency: UploadFrequency) -> Self {
        UploadConfig {
            base_interval_ms: frequency.base_interval_ms(),
            low_battery_threshold_percent: 10,
        }
    }

    /// Override the base interval directly (mostly for tests).
    pub fn with_base_interval_ms(mut self, base_ms: u64) -> Self {
        self.base_interval_ms = base_ms;
        self
    }

    pub fn min_delay_ms(&self) -> u64 {
        self.base_interval_ms
    }

    pub fn initial_delay_ms(&self) -> u64 {
        5 * self.base_interval_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        10 * self.base_interval_ms
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig::new(UploadFrequency::Average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_bounds_derive_from_base() {
        let config = UploadConfig::new(UploadFrequency::Average);
        assert_eq!(config.min_delay_ms(), 5_000);
        assert_eq!(config.initial_delay_ms(), 25_000);
        assert_eq!(config.max_delay_ms(), 50_000);
    }

    #[test]
    fn test_frequency_presets() {
        assert_eq!(UploadFrequency::Frequent.base_interval_ms(), 1_000);
        assert_eq!(UploadFrequency::Average.base_interval_ms(), 5_000);
        assert_eq!(UploadFrequency::Rare.base_interval_ms(), 10_000);
    }
}
