use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::ground_station::Observer;
use crate::predict::propagator::OrbitPropagator;
use crate::predict::types::{round_degrees, Pass};

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for initial scan
const FINE_STEP_SECONDS: i64 = 1; // 1 second for refinement

/// Find the first complete pass that rises after `observer.clock`.
///
/// A pass already in progress at the observer clock is skipped. Returns
/// `Ok(None)` when no complete pass fits in `search_span`.
pub fn find_next_pass<P: OrbitPropagator>(
    propagator: &P,
    observer: &Observer,
    satellite: &P::Satellite,
    search_span: Duration,
) -> Result<Option<Pass>, PredictError> {
    let coarse_step = Duration::seconds(COARSE_STEP_SECONDS);
    let limit = observer.clock + search_span;
    let horizon = observer.horizon_deg;
    let elevation = |at: DateTime<Utc>| {
        propagator
            .look_angles(observer, satellite, at)
            .map(|angles| angles.elevation_deg)
    };

    let mut cursor = observer.clock;
    while elevation(cursor)? >= horizon {
        cursor += coarse_step;
        if cursor > limit {
            return Ok(None);
        }
    }

    // AOS
    let rise_time = loop {
        let next = cursor + coarse_step;
        if next > limit {
            return Ok(None);
        }
        if elevation(next)? >= horizon {
            break refine_crossing(propagator, observer, satellite, cursor, next, true)?;
        }
        cursor = next;
    };

    // LOS, tracking the coarse peak on the way
    let mut max_el = elevation(rise_time)?;
    let mut max_el_time = rise_time;
    let mut cursor = rise_time;
    let set_time = loop {
        let next = cursor + coarse_step;
        if next > limit {
            return Ok(None);
        }
        let el = elevation(next)?;
        if el < horizon {
            break refine_crossing(propagator, observer, satellite, cursor, next, false)?;
        }
        if el > max_el {
            max_el = el;
            max_el_time = next;
        }
        cursor = next;
    };

    let tca_time = refine_peak(
        propagator,
        observer,
        satellite,
        (max_el_time - coarse_step).max(rise_time),
        (max_el_time + coarse_step).min(set_time),
    )?;

    let rise = propagator.look_angles(observer, satellite, rise_time)?;
    let set = propagator.look_angles(observer, satellite, set_time)?;
    let tca = propagator.look_angles(observer, satellite, tca_time)?;

    Ok(Some(Pass {
        rise_time,
        set_time,
        tca_time,
        rise_az: round_degrees(rise.azimuth_deg),
        set_az: round_degrees(set.azimuth_deg),
        tca_alt: round_degrees(tca.elevation_deg),
    }))
}

/// Binary search for the horizon crossing between `before` and `after`.
/// Returns the edge that is above the horizon.
fn refine_crossing<P: OrbitPropagator>(
    propagator: &P,
    observer: &Observer,
    satellite: &P::Satellite,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    is_aos: bool, // true = rising, false = setting
) -> Result<DateTime<Utc>, PredictError> {
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = propagator.look_angles(observer, satellite, mid)?.elevation_deg
            >= observer.horizon_deg;
        if above == is_aos {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(if is_aos { high } else { low })
}

/// Ternary search for peak elevation, assuming a single maximum in range.
fn refine_peak<P: OrbitPropagator>(
    propagator: &P,
    observer: &Observer,
    satellite: &P::Satellite,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<DateTime<Utc>, PredictError> {
    let elevation = |at: DateTime<Utc>| {
        propagator
            .look_angles(observer, satellite, at)
            .map(|angles| angles.elevation_deg)
    };

    let mut low = start;
    let mut high = end;
    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let third = (high - low) / 3;
        let m1 = low + third;
        let m2 = high - third;
        if elevation(m1)? < elevation(m2)? {
            low = m1;
        } else {
            high = m2;
        }
    }

    Ok(if elevation(low)? >= elevation(high)? {
        low
    } else {
        high
    })
}
