use serde::{Deserialize, Serialize};

use crate::predict::Tle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Antenna {
    /// Lowest supported frequency, Hz
    pub frequency_min: u64,
    /// Highest supported frequency, Hz
    pub frequency_max: u64,
}

impl Antenna {
    pub fn covers(&self, frequency_hz: u64) -> bool {
        self.frequency_min <= frequency_hz && frequency_hz <= self.frequency_max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Metres above sea level
    #[serde(default)]
    pub alt: f64,
    /// Minimum elevation in degrees
    #[serde(default = "default_horizon")]
    pub horizon: f64,
    #[serde(default)]
    pub antennas: Vec<Antenna>,
}

fn default_horizon() -> f64 {
    10.0
}

impl Station {
    pub fn supports_frequency(&self, frequency_hz: u64) -> bool {
        self.antennas.iter().any(|antenna| antenna.covers(frequency_hz))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Satellite {
    pub norad_id: u32,
    pub name: Option<String>,
    pub latest_tle: Option<Tle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transmitter {
    pub uuid: String,
    #[serde(default)]
    pub downlink_low: Option<u64>,
    #[serde(default)]
    pub downlink_high: Option<u64>,
    #[serde(default)]
    pub downlink_drift: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
