use chrono::{DateTime, Utc};

use crate::predict::error::PredictError;
use crate::predict::ground_station::Observer;
use crate::predict::types::{round_degrees, LookAngles, Pass, Tle};

/// Source of pass predictions and look angles.
///
/// Implementations perform no I/O; every call is bounded CPU work.
pub trait OrbitPropagator {
    /// Propagator-specific satellite state built from a TLE.
    type Satellite;

    fn load(&self, tle: &Tle) -> Result<Self::Satellite, PredictError>;

    /// Next pass above `observer.horizon_deg` after `observer.clock`.
    ///
    /// `Ok(None)` means the satellite does not rise within the propagator's
    /// search span.
    fn next_pass(
        &self,
        observer: &Observer,
        satellite: &Self::Satellite,
    ) -> Result<Option<Pass>, PredictError>;

    fn look_angles(
        &self,
        observer: &Observer,
        satellite: &Self::Satellite,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PredictError>;

    /// Azimuth at `at`, rounded to whole degrees.
    fn azimuth_at(
        &self,
        observer: &Observer,
        satellite: &Self::Satellite,
        at: DateTime<Utc>,
    ) -> Result<f64, PredictError> {
        Ok(round_degrees(self.look_angles(observer, satellite, at)?.azimuth_deg))
    }

    /// Elevation at `at`, rounded to whole degrees.
    fn elevation_at(
        &self,
        observer: &Observer,
        satellite: &Self::Satellite,
        at: DateTime<Utc>,
    ) -> Result<f64, PredictError> {
        Ok(round_degrees(self.look_angles(observer, satellite, at)?.elevation_deg))
    }
}
