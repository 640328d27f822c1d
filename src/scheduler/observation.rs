use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Satellite, Station, Transmitter, User};
use crate::predict::{Observer, OrbitPropagator, Tle};
use crate::scheduler::error::{SchedulingError, SchedulingResult};
use crate::scheduler::interval::Interval;
use crate::scheduler::overlap::resolve_overlaps;
use crate::scheduler::storage::BookingStore;

/// A booked observation with the geometry fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub station_id: u32,
    pub norad_id: u32,
    pub tle: Tle,
    pub transmitter: Transmitter,
    pub author: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub rise_azimuth: f64,
    pub max_altitude: f64,
    pub set_azimuth: f64,
}

impl Observation {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Everything needed to book one observation, already looked up.
#[derive(Debug, Clone, Copy)]
pub struct BookingRequest<'a> {
    pub station: &'a Station,
    pub satellite: &'a Satellite,
    pub transmitter: &'a Transmitter,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub author: &'a User,
}

impl BookingRequest<'_> {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

pub struct ObservationFactory<'a, P, S> {
    pub propagator: &'a P,
    pub store: &'a S,
}

impl<P: OrbitPropagator, S: BookingStore> ObservationFactory<'_, P, S> {
    /// Build an unsaved observation for `request`.
    ///
    /// Any contact with a future booking on the station is an overlap; there
    /// is no partial acceptance here. Callers hold the station lock from
    /// this call until the observation is saved.
    pub fn create(
        &self,
        request: &BookingRequest<'_>,
        now: DateTime<Utc>,
    ) -> SchedulingResult<Observation> {
        let station = request.station;
        let existing = self.store.future_bookings_for(station.id, now)?;
        if resolve_overlaps(&existing, request.interval()).overlapped {
            return Err(SchedulingError::Overlap {
                station_id: station.id,
            });
        }

        let tle = request.satellite.latest_tle.as_ref().ok_or_else(|| {
            SchedulingError::OutOfRange(format!(
                "no TLE for satellite {}",
                request.satellite.norad_id
            ))
        })?;

        let satellite = self.propagator.load(tle)?;
        let observer = Observer::for_station(station, None, request.start);
        let midpoint = request.start + (request.end - request.start) / 2;

        let observation = Observation {
            station_id: station.id,
            norad_id: request.satellite.norad_id,
            tle: tle.clone(),
            transmitter: request.transmitter.clone(),
            author: request.author.name.clone(),
            start: request.start,
            end: request.end,
            rise_azimuth: self
                .propagator
                .azimuth_at(&observer, &satellite, request.start)?,
            max_altitude: self.propagator.elevation_at(&observer, &satellite, midpoint)?,
            set_azimuth: self.propagator.azimuth_at(&observer, &satellite, request.end)?,
        };

        log::debug!(
            "Prepared observation of {} on station {}: {} - {}",
            observation.norad_id,
            observation.station_id,
            observation.start,
            observation.end
        );
        Ok(observation)
    }
}
