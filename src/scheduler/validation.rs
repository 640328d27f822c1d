use chrono::{DateTime, Utc};

use crate::model::{Station, Transmitter};
use crate::scheduler::error::{SchedulingError, SchedulingResult};
use crate::scheduler::settings::SchedulingSettings;

/// Bounds on when a new booking may run, relative to `now`.
pub fn check_start_end(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
    settings: &SchedulingSettings,
) -> SchedulingResult<()> {
    if end <= start {
        return Err(SchedulingError::OutOfRange(format!(
            "end {} is not after start {}",
            end, start
        )));
    }
    if start < now + settings.min_start_offset {
        return Err(SchedulingError::OutOfRange(format!(
            "start must be at least {} minutes from now",
            settings.min_start_offset.num_minutes()
        )));
    }
    if end > now + settings.max_booking_range {
        return Err(SchedulingError::OutOfRange(format!(
            "end must be within {} minutes from now",
            settings.max_booking_range.num_minutes()
        )));
    }
    Ok(())
}

/// The station needs an antenna covering the transmitter's downlink.
pub fn check_transmitter_station(
    transmitter: &Transmitter,
    station: &Station,
) -> SchedulingResult<()> {
    let downlink = transmitter.downlink_low.ok_or_else(|| {
        SchedulingError::OutOfRange(format!("transmitter {} has no downlink", transmitter.uuid))
    })?;
    if !station.supports_frequency(downlink) {
        return Err(SchedulingError::OutOfRange(format!(
            "transmitter {} ({} Hz) is outside the antenna range of station {}",
            transmitter.uuid, downlink, station.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Antenna;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn accepts_booking_inside_bounds() {
        let settings = SchedulingSettings::default();
        let start = now() + Duration::minutes(15);
        assert!(check_start_end(start, start + Duration::minutes(10), now(), &settings).is_ok());
    }

    #[test]
    fn rejects_inverted_early_and_distant_bookings() {
        let settings = SchedulingSettings::default();
        let start = now() + Duration::minutes(15);
        let cases = [
            (start, start),
            (now() + Duration::minutes(5), now() + Duration::minutes(20)),
            (start, now() + Duration::minutes(2891)),
        ];
        for (s, e) in cases {
            assert!(matches!(
                check_start_end(s, e, now(), &settings),
                Err(SchedulingError::OutOfRange(_))
            ));
        }
    }

    #[test]
    fn transmitter_must_fit_an_antenna() {
        let station = Station {
            id: 1,
            name: "vhf".into(),
            lat: 0.0,
            lng: 0.0,
            alt: 0.0,
            horizon: 10.0,
            antennas: vec![Antenna {
                frequency_min: 144_000_000,
                frequency_max: 146_000_000,
            }],
        };
        let mut transmitter = Transmitter {
            uuid: "tx".into(),
            downlink_low: Some(145_800_000),
            downlink_high: None,
            downlink_drift: None,
        };
        assert!(check_transmitter_station(&transmitter, &station).is_ok());

        transmitter.downlink_low = Some(437_000_000);
        assert!(check_transmitter_station(&transmitter, &station).is_err());

        transmitter.downlink_low = None;
        assert!(check_transmitter_station(&transmitter, &station).is_err());
    }
}
