use std::collections::HashMap;

use chrono::Duration;

use crate::scheduler::error::SchedulingError;
use crate::scheduler::interval::Interval;

/// Gap kept between a resolved window and the booking it was cut against.
pub const GUARD_INTERVAL: Duration = Duration::seconds(30);

/// Free sub-intervals of a candidate, and whether any booking touched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub windows: Vec<Interval>,
    pub overlapped: bool,
}

impl Resolution {
    fn blocked() -> Self {
        Self {
            windows: Vec::new(),
            overlapped: true,
        }
    }
}

/// Cut `candidate` against the already booked intervals of one station.
///
/// Returns
/// - no windows, overlapped, if a booking covers the whole candidate
/// - two or more windows, overlapped, if a booking sits inside the candidate
/// - one narrowed window, overlapped, if bookings clip either end
/// - the candidate unchanged, not overlapped, if nothing intersects it
///
/// Windows that collapse to nothing after narrowing are dropped.
pub fn resolve_overlaps(existing: &[Interval], candidate: Interval) -> Resolution {
    let Interval { mut start, mut end } = candidate;
    let mut overlapped = false;

    for booked in existing {
        if !booked.intersects(&Interval::new(start, end)) {
            continue;
        }
        overlapped = true;

        if booked.start <= start && booked.end >= end {
            return Resolution::blocked();
        }

        if start < booked.start && end > booked.end {
            // Each half is checked again against every booking
            let left = resolve_overlaps(existing, Interval::new(start, booked.start - GUARD_INTERVAL));
            let right = resolve_overlaps(existing, Interval::new(booked.end + GUARD_INTERVAL, end));
            let mut windows = left.windows;
            windows.extend(right.windows);
            return Resolution {
                windows,
                overlapped: true,
            };
        }

        if booked.start <= start {
            start = booked.end + GUARD_INTERVAL;
        }
        if booked.end >= end {
            end = booked.start - GUARD_INTERVAL;
        }
    }

    let window = Interval::new(start, end);
    Resolution {
        windows: if window.is_empty() { Vec::new() } else { vec![window] },
        overlapped,
    }
}

/// Reject a batch of requested bookings if any two on the same station
/// intersect each other.
pub fn check_batch_overlaps<I>(requests: I) -> Result<(), SchedulingError>
where
    I: IntoIterator<Item = (u32, Interval)>,
{
    let mut per_station: HashMap<u32, Vec<Interval>> = HashMap::new();
    for (station_id, interval) in requests {
        let seen = per_station.entry(station_id).or_default();
        if resolve_overlaps(seen, interval).overlapped {
            return Err(SchedulingError::Overlap { station_id });
        }
        seen.push(interval);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, h, m, s).unwrap()
    }

    fn span(a: (u32, u32), b: (u32, u32)) -> Interval {
        Interval::new(at(a.0, a.1, 0), at(b.0, b.1, 0))
    }

    #[test]
    fn no_bookings_keeps_candidate() {
        let candidate = span((10, 0), (10, 30));
        let resolution = resolve_overlaps(&[], candidate);
        assert_eq!(resolution.windows, vec![candidate]);
        assert!(!resolution.overlapped);
    }

    #[test]
    fn disjoint_bookings_keep_candidate() {
        let existing = [span((8, 0), (9, 0)), span((12, 0), (13, 0))];
        let candidate = span((10, 0), (11, 0));
        let resolution = resolve_overlaps(&existing, candidate);
        assert_eq!(resolution.windows, vec![candidate]);
        assert!(!resolution.overlapped);
    }

    #[test]
    fn covering_booking_blocks_candidate() {
        let existing = [span((10, 0), (11, 0))];
        let resolution = resolve_overlaps(&existing, span((10, 30), (10, 45)));
        assert!(resolution.windows.is_empty());
        assert!(resolution.overlapped);
    }

    #[test]
    fn inner_booking_splits_candidate_with_guard() {
        let existing = [span((10, 0), (10, 10))];
        let resolution = resolve_overlaps(&existing, span((9, 50), (10, 20)));
        assert_eq!(
            resolution.windows,
            vec![
                Interval::new(at(9, 50, 0), at(9, 59, 30)),
                Interval::new(at(10, 10, 30), at(10, 20, 0)),
            ]
        );
        assert!(resolution.overlapped);
    }

    #[test]
    fn booking_on_left_edge_advances_start() {
        let existing = [span((9, 0), (10, 5))];
        let resolution = resolve_overlaps(&existing, span((10, 0), (11, 0)));
        assert_eq!(
            resolution.windows,
            vec![Interval::new(at(10, 5, 30), at(11, 0, 0))]
        );
        assert!(resolution.overlapped);
    }

    #[test]
    fn booking_on_right_edge_retracts_end() {
        let existing = [span((10, 50), (12, 0))];
        let resolution = resolve_overlaps(&existing, span((10, 0), (11, 0)));
        assert_eq!(
            resolution.windows,
            vec![Interval::new(at(10, 0, 0), at(10, 49, 30))]
        );
        assert!(resolution.overlapped);
    }

    #[test]
    fn touching_booking_counts_as_overlap() {
        let existing = [span((9, 0), (10, 0))];
        let resolution = resolve_overlaps(&existing, span((10, 0), (10, 30)));
        assert!(resolution.overlapped);
        assert_eq!(resolution.windows[0].start, at(10, 0, 30));
    }

    #[test]
    fn split_halves_are_cut_against_all_bookings() {
        let existing = [
            span((10, 20), (10, 30)),
            span((10, 0), (10, 5)),
            span((10, 40), (11, 30)),
        ];
        let resolution = resolve_overlaps(&existing, span((9, 50), (11, 0)));
        assert_eq!(
            resolution.windows,
            vec![
                Interval::new(at(9, 50, 0), at(9, 59, 30)),
                Interval::new(at(10, 5, 30), at(10, 19, 30)),
                Interval::new(at(10, 30, 30), at(10, 39, 30)),
            ]
        );
    }

    #[test]
    fn sliver_inside_guard_is_dropped() {
        let existing = [span((10, 0), (10, 10))];
        let candidate = Interval::new(at(9, 59, 50), at(10, 20, 0));
        let resolution = resolve_overlaps(&existing, candidate);
        assert_eq!(
            resolution.windows,
            vec![Interval::new(at(10, 10, 30), at(10, 20, 0))]
        );
    }

    #[test]
    fn batch_rejects_intersecting_requests_per_station() {
        let ok = check_batch_overlaps([
            (1, span((10, 0), (10, 10))),
            (2, span((10, 0), (10, 10))),
            (1, span((11, 0), (11, 10))),
        ]);
        assert!(ok.is_ok());

        let err = check_batch_overlaps([
            (1, span((10, 0), (10, 10))),
            (2, span((10, 0), (10, 10))),
            (2, span((10, 5), (10, 20))),
        ])
        .unwrap_err();
        assert!(matches!(err, SchedulingError::Overlap { station_id: 2 }));
    }

    fn disjoint_bookings() -> impl Strategy<Value = Vec<Interval>> {
        prop::collection::vec((1i64..120, 1i64..90), 0..8).prop_map(|parts| {
            let mut cursor = at(0, 0, 0);
            parts
                .into_iter()
                .map(|(gap, len)| {
                    let start = cursor + Duration::minutes(gap);
                    let end = start + Duration::minutes(len);
                    cursor = end;
                    Interval::new(start, end)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn windows_are_disjoint_and_clear_of_bookings(
            mut existing in disjoint_bookings(),
            offset in 0i64..900,
            len in 1i64..600,
            reversed in any::<bool>(),
        ) {
            if reversed {
                existing.reverse();
            }
            let start = at(0, 0, 0) + Duration::minutes(offset);
            let candidate = Interval::new(start, start + Duration::minutes(len));
            let resolution = resolve_overlaps(&existing, candidate);

            for window in &resolution.windows {
                prop_assert!(!window.is_empty());
                prop_assert!(window.start >= candidate.start && window.end <= candidate.end);
                for booked in &existing {
                    prop_assert!(!window.intersects(booked));
                }
            }
            for pair in resolution.windows.windows(2) {
                prop_assert!(pair[0].end < pair[1].start);
            }
            if existing.iter().all(|b| !b.intersects(&candidate)) {
                prop_assert_eq!(resolution.windows, vec![candidate]);
                prop_assert!(!resolution.overlapped);
            } else {
                prop_assert!(resolution.overlapped);
            }
        }
    }
}
