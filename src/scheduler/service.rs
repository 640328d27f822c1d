use chrono::{DateTime, Utc};

use crate::model::{Satellite, Station};
use crate::predict::OrbitPropagator;
use crate::scheduler::eligibility::PermissionService;
use crate::scheduler::error::{SchedulingError, SchedulingResult};
use crate::scheduler::locks::StationLocks;
use crate::scheduler::observation::{BookingRequest, Observation, ObservationFactory};
use crate::scheduler::overlap::check_batch_overlaps;
use crate::scheduler::scanner::{PassScanner, ScanOutcome, ScanRequest};
use crate::scheduler::settings::SchedulingSettings;
use crate::scheduler::storage::BookingStore;
use crate::scheduler::validation::{check_start_end, check_transmitter_station};
use crate::scheduler::windows::OverlapMode;

/// A window search for one satellite over one station.
#[derive(Debug, Clone, Copy)]
pub struct WindowQuery<'a> {
    pub station: &'a Station,
    pub satellite: &'a Satellite,
    pub min_horizon: Option<f64>,
    pub mode: OverlapMode,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Window discovery and booking over one propagator and one booking store.
pub struct Scheduler<P, S> {
    propagator: P,
    store: S,
    locks: StationLocks,
    settings: SchedulingSettings,
}

impl<P: OrbitPropagator, S: BookingStore> Scheduler<P, S> {
    pub fn new(propagator: P, store: S, settings: SchedulingSettings) -> Self {
        Self {
            propagator,
            store,
            locks: StationLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SchedulingSettings {
        &self.settings
    }

    /// Passes of the queried satellite and the windows still bookable on them.
    pub fn predict_windows(
        &self,
        query: &WindowQuery<'_>,
        now: DateTime<Utc>,
    ) -> SchedulingResult<ScanOutcome> {
        let tle = query.satellite.latest_tle.as_ref().ok_or_else(|| {
            SchedulingError::OutOfRange(format!("no TLE for satellite {}", query.satellite.norad_id))
        })?;
        let scanner = PassScanner {
            propagator: &self.propagator,
            store: &self.store,
            settings: &self.settings,
        };
        scanner.scan(
            &ScanRequest {
                station: query.station,
                satellite: query.satellite,
                tle,
                min_horizon: query.min_horizon,
                mode: query.mode,
                start: query.start,
                end: query.end,
            },
            now,
        )
    }

    /// Book one observation. Returns the stored id with the observation.
    pub fn book(
        &self,
        request: &BookingRequest<'_>,
        permissions: &impl PermissionService,
        now: DateTime<Utc>,
    ) -> SchedulingResult<(String, Observation)> {
        self.validate(request, permissions, now)?;

        self.locks.with_station(request.station.id, || {
            let _held = self.store.lock_station(request.station.id)?;
            let observation = self.factory().create(request, now)?;
            let id = self.store.save(&observation)?;
            Ok((id, observation))
        })
    }

    /// Book several observations, possibly on several stations.
    ///
    /// Every observation is created before the first is saved, so a conflict
    /// anywhere in the batch stores nothing.
    pub fn book_all(
        &self,
        requests: &[BookingRequest<'_>],
        permissions: &impl PermissionService,
        now: DateTime<Utc>,
    ) -> SchedulingResult<Vec<(String, Observation)>> {
        check_batch_overlaps(requests.iter().map(|r| (r.station.id, r.interval())))?;
        for request in requests {
            self.validate(request, permissions, now)?;
        }

        let station_ids: Vec<u32> = requests.iter().map(|r| r.station.id).collect();
        self.locks.with_stations(&station_ids, || {
            let _held = self.lock_stored(&station_ids)?;
            let factory = self.factory();
            let observations = requests
                .iter()
                .map(|request| factory.create(request, now))
                .collect::<SchedulingResult<Vec<_>>>()?;

            let mut stored = Vec::with_capacity(observations.len());
            for observation in observations {
                let id = self.store.save(&observation)?;
                stored.push((id, observation));
            }
            log::info!("Booked {} observations", stored.len());
            Ok(stored)
        })
    }

    fn validate(
        &self,
        request: &BookingRequest<'_>,
        permissions: &impl PermissionService,
        now: DateTime<Utc>,
    ) -> SchedulingResult<()> {
        check_start_end(request.start, request.end, now, &self.settings)?;
        if !permissions.can_schedule(request.author, request.station) {
            return Err(SchedulingError::Permission {
                user: request.author.name.clone(),
                station_id: request.station.id,
            });
        }
        check_transmitter_station(request.transmitter, request.station)
    }

    /// Store locks for every station, taken in ascending id order.
    fn lock_stored(&self, station_ids: &[u32]) -> SchedulingResult<Vec<S::StationLock>> {
        let mut ids = station_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter()
            .map(|id| self.store.lock_station(id).map_err(SchedulingError::from))
            .collect()
    }

    fn factory(&self) -> ObservationFactory<'_, P, S> {
        ObservationFactory {
            propagator: &self.propagator,
            store: &self.store,
        }
    }
}
