use chrono::{DateTime, Utc};

use crate::model::Station;

/// Observer state handed to the propagator: where the station is, the
/// elevation a satellite must clear, and the instant searches start from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub horizon_deg: f64,
    pub clock: DateTime<Utc>,
}

impl Observer {
    /// Observer at `station`, using `min_horizon` instead of the station's own
    /// horizon when given.
    pub fn for_station(station: &Station, min_horizon: Option<f64>, clock: DateTime<Utc>) -> Self {
        Self {
            latitude_deg: station.lat,
            longitude_deg: station.lng,
            altitude_m: station.alt,
            horizon_deg: min_horizon.unwrap_or(station.horizon),
            clock,
        }
    }

    pub fn at(self, clock: DateTime<Utc>) -> Self {
        Self { clock, ..self }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        let x = (n + alt_km) * lat.cos() * lon.cos();
        let y = (n + alt_km) * lat.cos() * lon.sin();
        let z = (n * (1.0 - e2) + alt_km) * sin_lat;
        [x, y, z]
    }
}
