use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::model::{Satellite, Station};
use crate::predict::{Observer, OrbitPropagator, Pass, PredictError, Tle};
use crate::scheduler::error::SchedulingResult;
use crate::scheduler::interval::Interval;
use crate::scheduler::overlap::resolve_overlaps;
use crate::scheduler::settings::SchedulingSettings;
use crate::scheduler::storage::BookingStore;
use crate::scheduler::windows::{OverlapMode, Window, WindowPolicy};

/// Gap between a pass's set and the next search
const NEXT_SEARCH_DELAY: Duration = Duration::minutes(1);

#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    pub station: &'a Station,
    pub satellite: &'a Satellite,
    pub tle: &'a Tle,
    /// Overrides the station horizon when set
    pub min_horizon: Option<f64>,
    pub mode: OverlapMode,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub passes: Vec<Pass>,
    pub windows: Vec<Window>,
}

/// Walks successive passes of one satellite over one station.
pub struct PassScanner<'a, P, S> {
    pub propagator: &'a P,
    pub store: &'a S,
    pub settings: &'a SchedulingSettings,
}

impl<P: OrbitPropagator, S: BookingStore> PassScanner<'_, P, S> {
    /// Passes that rise and set inside `[request.start, request.end]`, and the
    /// windows bookable on them.
    pub fn scan(
        &self,
        request: &ScanRequest<'_>,
        now: DateTime<Utc>,
    ) -> SchedulingResult<ScanOutcome> {
        let satellite = self.propagator.load(request.tle)?;
        let mut observer = Observer::for_station(request.station, request.min_horizon, request.start);
        let mut outcome = ScanOutcome::default();

        loop {
            if outcome.passes.len() >= self.settings.max_passes {
                log::warn!(
                    "Stopping scan of {} over station {} after {} passes",
                    request.satellite.norad_id,
                    request.station.id,
                    outcome.passes.len()
                );
                break;
            }

            let Some(pass) = self.next_ordered_pass(&mut observer, &satellite)? else {
                break;
            };
            if pass.rise_time >= request.end || pass.set_time > request.end {
                break;
            }

            outcome.passes.push(pass);

            if pass.duration() > self.settings.min_duration {
                let existing = self.store.future_bookings_for(request.station.id, now)?;
                let resolution =
                    resolve_overlaps(&existing, Interval::new(pass.rise_time, pass.set_time));
                let policy = WindowPolicy {
                    propagator: self.propagator,
                    observer: &observer,
                    satellite: &satellite,
                    tle: request.tle,
                    min_duration: self.settings.min_duration,
                };
                outcome
                    .windows
                    .extend(policy.apply(&pass, &resolution, request.mode)?);
            }

            observer = observer.at(pass.set_time + NEXT_SEARCH_DELAY);
        }

        log::debug!(
            "Scanned {} over station {}: {} passes, {} windows",
            request.satellite.norad_id,
            request.station.id,
            outcome.passes.len(),
            outcome.windows.len()
        );
        Ok(outcome)
    }

    /// Next pass whose rise precedes its set.
    ///
    /// A propagator called while the satellite is already up may report the
    /// current pass's set together with the following rise. Such a pass is
    /// skipped by restarting the search after its set.
    fn next_ordered_pass(
        &self,
        observer: &mut Observer,
        satellite: &P::Satellite,
    ) -> SchedulingResult<Option<Pass>> {
        let retries = self.settings.max_pass_retries;
        for _ in 0..=retries {
            let Some(pass) = self.propagator.next_pass(observer, satellite)? else {
                return Ok(None);
            };
            if pass.is_ordered() {
                return Ok(Some(pass));
            }
            log::debug!(
                "Pass set {} precedes rise {}, searching again",
                pass.set_time,
                pass.rise_time
            );
            *observer = observer.at(pass.set_time + NEXT_SEARCH_DELAY);
        }
        Err(PredictError::UnorderedPass { retries }.into())
    }
}
