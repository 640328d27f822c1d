use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;
use crate::predict::ground_station::Observer;
use crate::predict::pass_finder::find_next_pass;
use crate::predict::propagator::OrbitPropagator;
use crate::predict::types::{LookAngles, Pass, Tle};

const DEFAULT_SEARCH_SPAN: Duration = Duration::days(3);

/// SGP4 state for one satellite
pub struct Sgp4Satellite {
    pub elements: Elements,
    pub constants: Constants,
}

/// `OrbitPropagator` backed by the `sgp4` crate.
#[derive(Debug, Clone, Copy)]
pub struct Sgp4Propagator {
    search_span: Duration,
}

impl Default for Sgp4Propagator {
    fn default() -> Self {
        Self {
            search_span: DEFAULT_SEARCH_SPAN,
        }
    }
}

impl Sgp4Propagator {
    /// `search_span` bounds how far past the observer clock `next_pass` looks.
    pub fn new(search_span: Duration) -> Self {
        Self { search_span }
    }
}

impl OrbitPropagator for Sgp4Propagator {
    type Satellite = Sgp4Satellite;

    fn load(&self, tle: &Tle) -> Result<Sgp4Satellite, PredictError> {
        let invalid = |message: String| PredictError::InvalidTle {
            source_name: tle.source.clone(),
            message,
        };
        let name = Some(tle.tle0.trim().to_string()).filter(|n| !n.is_empty());
        let elements = Elements::from_tle(name, tle.tle1.as_bytes(), tle.tle2.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;
        Ok(Sgp4Satellite {
            elements,
            constants,
        })
    }

    fn next_pass(
        &self,
        observer: &Observer,
        satellite: &Sgp4Satellite,
    ) -> Result<Option<Pass>, PredictError> {
        find_next_pass(self, observer, satellite, self.search_span)
    }

    fn look_angles(
        &self,
        observer: &Observer,
        satellite: &Sgp4Satellite,
        at: DateTime<Utc>,
    ) -> Result<LookAngles, PredictError> {
        look_angles(observer, satellite, at)
    }
}

pub fn look_angles(
    observer: &Observer,
    satellite: &Sgp4Satellite,
    timestamp: DateTime<Utc>,
) -> Result<LookAngles, PredictError> {
    let minutes = satellite
        .elements
        .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let prediction = satellite
        .constants
        .propagate(minutes)
        .map_err(|e| PredictError::Propagation(e.to_string()))?;

    let sidereal =
        sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp.naive_utc()));

    let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
    let sta_ecef = observer.position_ecef_km();

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).asin().to_degrees()
    } else {
        0.0
    };

    Ok(LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
    })
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn iss_tle() -> Tle {
        Tle {
            tle0: "ISS (ZARYA)".into(),
            tle1: "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927".into(),
            tle2: "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537".into(),
            norad_id: 25544,
            source: "test".into(),
            updated: Utc.with_ymd_and_hms(2008, 9, 20, 12, 0, 0).unwrap(),
        }
    }

    pub(crate) fn observer() -> Observer {
        Observer {
            latitude_deg: 45.0,
            longitude_deg: 10.0,
            altitude_m: 100.0,
            horizon_deg: 0.0,
            clock: Utc.with_ymd_and_hms(2008, 9, 20, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn enu_up_vector_at_equator() {
        let (e, n, u) = ecef_to_enu([1.0, 0.0, 0.0], 0.0, 0.0);
        assert!(e.abs() < 1e-12);
        assert!(n.abs() < 1e-12);
        assert!((u - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_tle() {
        let mut tle = iss_tle();
        tle.tle1 = "1 garbage".into();
        let err = Sgp4Propagator::default().load(&tle).err().unwrap();
        assert!(matches!(err, PredictError::InvalidTle { .. }));
    }

    #[test]
    fn look_angles_stay_in_range() {
        let propagator = Sgp4Propagator::default();
        let satellite = propagator.load(&iss_tle()).unwrap();
        let observer = observer();
        for minutes in (0..180).step_by(7) {
            let at = observer.clock + Duration::minutes(minutes);
            let angles = propagator.look_angles(&observer, &satellite, at).unwrap();
            assert!((0.0..360.0).contains(&angles.azimuth_deg));
            assert!((-90.0..=90.0).contains(&angles.elevation_deg));
            // low earth orbit, never further than the far side of the planet
            assert!(angles.range_km > 300.0 && angles.range_km < 14_000.0);
        }
    }

    #[test]
    fn next_pass_is_ordered_and_above_horizon() {
        let propagator = Sgp4Propagator::default();
        let satellite = propagator.load(&iss_tle()).unwrap();
        let observer = observer();

        let pass = propagator
            .next_pass(&observer, &satellite)
            .unwrap()
            .expect("ISS rises within three days");

        assert!(pass.is_ordered());
        assert!(pass.rise_time >= observer.clock);
        assert!(pass.rise_time <= pass.tca_time && pass.tca_time <= pass.set_time);
        // a LEO pass lasts minutes, not hours
        assert!(pass.duration() < Duration::minutes(20));
        assert!(pass.tca_alt >= 0.0);
        assert_eq!(pass.tca_alt, pass.tca_alt.round());
        assert_eq!(pass.rise_az, pass.rise_az.round());

        let mid = propagator
            .elevation_at(&observer, &satellite, pass.tca_time)
            .unwrap();
        assert_eq!(mid, pass.tca_alt);
    }
}
