//! Readiness gates polled before each upload run.
//!
//! Both gates are polled, not pushed: the scheduler asks right before a run
//! and simply reschedules when a gate is closed.

/// Network readiness, as observed by the host platform.
pub trait NetworkGate: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Device power snapshot at poll time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStatus {
    /// Battery is full or the device is charging.
    pub battery_full_or_charging: bool,
    /// Device runs on external power.
    pub on_external_power: bool,
    /// Battery level, 0-100.
    pub battery_level_percent: u8,
    /// The OS power-save mode is active.
    pub power_save_mode: bool,
}

impl PowerStatus {
    /// Whether uploading is acceptable: enough battery (or charging, or
    /// external power) and power-save mode off.
    pub fn allows_upload(&self, low_battery_threshold_percent: u8) -> bool {
        let has_power = self.battery_full_or_charging
            || self.on_external_power
            || self.battery_level_percent > low_battery_threshold_percent;
        has_power && !self.power_save_mode
    }
}

/// Power readiness source the host platform implements.
pub trait PowerGate: Send + Sync {
    fn power_status(&self) -> PowerStatus;
}
