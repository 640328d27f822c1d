use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A two-line element set, with its title line, as loaded for one satellite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tle {
    pub tle0: String,
    pub tle1: String,
    pub tle2: String,
    pub norad_id: u32,
    pub source: String,
    pub updated: DateTime<Utc>,
}

/// A predicted satellite pass over an observer, angles in whole degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pass {
    pub rise_time: DateTime<Utc>,
    pub set_time: DateTime<Utc>,
    pub tca_time: DateTime<Utc>,
    pub rise_az: f64,
    pub set_az: f64,
    pub tca_alt: f64,
}

impl Pass {
    pub fn duration(&self) -> Duration {
        self.set_time - self.rise_time
    }

    /// False when the propagator reported the set before the rise, which
    /// happens when the observer clock sits inside a pass.
    pub fn is_ordered(&self) -> bool {
        self.rise_time < self.set_time
    }
}

/// Unrounded topocentric look angles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

/// Whole degrees, halves to even.
pub fn round_degrees(value: f64) -> f64 {
    value.round_ties_even()
}
