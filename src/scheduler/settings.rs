use chrono::Duration;
use serde::Deserialize;

use crate::time_expr::deserialize_duration;

/// Tunables shared by window discovery and booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulingSettings {
    /// Passes and windows must last strictly longer than this
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_duration: Duration,
    /// Retries when the propagator reports a set before its rise
    pub max_pass_retries: u32,
    /// Upper bound on passes examined by one scan
    pub max_passes: usize,
    /// How soon after now a booking may start
    #[serde(deserialize_with = "deserialize_duration")]
    pub min_start_offset: Duration,
    /// How far after now a booking may end
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_booking_range: Duration,
}

impl Default for SchedulingSettings {
    fn default() -> Self {
        Self {
            min_duration: Duration::seconds(120),
            max_pass_retries: 10,
            max_passes: 1000,
            min_start_offset: Duration::minutes(10),
            max_booking_range: Duration::minutes(2890),
        }
    }
}
