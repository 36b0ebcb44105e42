use crate::smoothing::config::config::SettingsError;
use crate::smoothing::core::network_time::send_rate_for_interval;
use crate::smoothing::core::snapshot_interpolation::snapshot_buffer::OverflowPolicy;
use serde::{Deserialize, Serialize};

/// Tuning of one interpolation timeline. Load-time constants; changing them
/// at runtime goes through a reset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SnapshotInterpolationSettings {
    pub buffer_time_multiplier: f64,
    pub buffer_limit: usize,
    // in send intervals, negative
    pub catchup_negative_threshold: f64,
    // in send intervals
    pub catchup_positive_threshold: f64,
    pub catchup_speed: f64,
    pub slow_down_speed: f64,
    // seconds
    pub drift_ema_duration: u32,
    pub dynamic_adjustment: bool,
    pub dynamic_adjustment_tolerance: f64,
    // seconds
    pub delivery_time_ema_duration: u32,
    pub overflow_policy: OverflowPolicy,
}

impl Default for SnapshotInterpolationSettings {
    fn default() -> Self {
        Self {
            buffer_time_multiplier: 2.0,
            buffer_limit: 32,
            catchup_negative_threshold: -1.0,
            catchup_positive_threshold: 1.0,
            catchup_speed: 0.02,
            slow_down_speed: 0.04,
            drift_ema_duration: 1,
            dynamic_adjustment: true,
            dynamic_adjustment_tolerance: 1.0,
            delivery_time_ema_duration: 2,
            overflow_policy: OverflowPolicy::DropNewest,
        }
    }
}

impl SnapshotInterpolationSettings {
    // EMA sample count for a duration in seconds
    fn ema_window(send_interval: f64, duration: u32) -> u32 {
        send_rate_for_interval(send_interval)
            .saturating_mul(duration)
            .max(1)
    }

    pub fn drift_ema_window(&self, send_interval: f64) -> u32 {
        Self::ema_window(send_interval, self.drift_ema_duration)
    }

    pub fn delivery_time_ema_window(&self, send_interval: f64) -> u32 {
        Self::ema_window(send_interval, self.delivery_time_ema_duration)
    }

    /// Sanity checks for integrators. The engine itself never calls this and
    /// runs with whatever it is given.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.buffer_time_multiplier <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "buffer_time_multiplier must be positive, got {}",
                self.buffer_time_multiplier
            )));
        }
        if self.buffer_limit < 2 {
            return Err(SettingsError::Invalid(format!(
                "buffer_limit must hold at least two snapshots, got {}",
                self.buffer_limit
            )));
        }
        if self.catchup_negative_threshold > 0.0 {
            return Err(SettingsError::Invalid(format!(
                "catchup_negative_threshold must not be positive, got {}",
                self.catchup_negative_threshold
            )));
        }
        if self.catchup_positive_threshold < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "catchup_positive_threshold must not be negative, got {}",
                self.catchup_positive_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.catchup_speed) || !(0.0..=1.0).contains(&self.slow_down_speed) {
            return Err(SettingsError::Invalid(format!(
                "catchup_speed and slow_down_speed must be within [0, 1], got {} and {}",
                self.catchup_speed, self.slow_down_speed
            )));
        }
        if self.drift_ema_duration == 0 || self.delivery_time_ema_duration == 0 {
            return Err(SettingsError::Invalid(
                "EMA durations must be at least one second".to_string(),
            ));
        }
        if self.dynamic_adjustment_tolerance < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "dynamic_adjustment_tolerance must not be negative, got {}",
                self.dynamic_adjustment_tolerance
            )));
        }
        Ok(())
    }
}
