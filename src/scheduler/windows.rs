use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::predict::{Observer, OrbitPropagator, Pass, PredictError, Tle};
use crate::scheduler::interval::Interval;
use crate::scheduler::overlap::Resolution;

/// How passes that collide with existing bookings are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapMode {
    /// Drop the pass
    #[default]
    Reject,
    /// One window per free part of the pass
    Truncate,
    /// The whole pass, flagged as overlapped
    KeepFull,
}

impl TryFrom<u8> for OverlapMode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OverlapMode::Reject),
            1 => Ok(OverlapMode::Truncate),
            2 => Ok(OverlapMode::KeepFull),
            other => Err(format!("unknown overlap mode code: {}", other)),
        }
    }
}

impl FromStr for OverlapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(OverlapMode::Reject),
            "truncate" => Ok(OverlapMode::Truncate),
            "keep-full" | "keep_full" | "full" => Ok(OverlapMode::KeepFull),
            other => other
                .parse::<u8>()
                .map_err(|_| format!("unknown overlap mode: {}", other))
                .and_then(OverlapMode::try_from),
        }
    }
}

impl fmt::Display for OverlapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OverlapMode::Reject => "reject",
            OverlapMode::Truncate => "truncate",
            OverlapMode::KeepFull => "keep-full",
        };
        f.write_str(name)
    }
}

/// A bookable part of a pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub az_start: f64,
    pub az_end: f64,
    pub elev_max: f64,
    pub tle: Tle,
    pub valid_duration: bool,
    pub overlapped: bool,
    pub overlap_ratio: f64,
}

/// Turns one pass and its conflict resolution into bookable windows.
pub struct WindowPolicy<'a, P: OrbitPropagator> {
    pub propagator: &'a P,
    pub observer: &'a Observer,
    pub satellite: &'a P::Satellite,
    pub tle: &'a Tle,
    pub min_duration: Duration,
}

impl<P: OrbitPropagator> WindowPolicy<'_, P> {
    pub fn apply(
        &self,
        pass: &Pass,
        resolution: &Resolution,
        mode: OverlapMode,
    ) -> Result<Vec<Window>, PredictError> {
        if resolution.windows.is_empty() {
            return Ok(Vec::new());
        }

        if !resolution.overlapped {
            return Ok(vec![self.full_pass_window(
                pass,
                self.over_min_duration(pass.duration()),
                false,
                0.0,
            )]);
        }

        match mode {
            OverlapMode::Reject => Ok(Vec::new()),
            OverlapMode::Truncate => self.truncated_windows(pass, &resolution.windows),
            OverlapMode::KeepFull => {
                let valid_duration = resolution
                    .windows
                    .iter()
                    .all(|w| self.over_min_duration(w.duration()));
                let free = resolution
                    .windows
                    .iter()
                    .fold(Duration::zero(), |acc, w| acc + w.duration());
                Ok(vec![self.full_pass_window(
                    pass,
                    valid_duration,
                    true,
                    overlap_ratio(free, pass.duration()),
                )])
            }
        }
    }

    fn truncated_windows(
        &self,
        pass: &Pass,
        windows: &[Interval],
    ) -> Result<Vec<Window>, PredictError> {
        let mut result = Vec::new();
        for window in windows {
            if !self.over_min_duration(window.duration()) {
                continue;
            }
            result.push(Window {
                start: window.start,
                end: window.end,
                az_start: self.azimuth_at(window.start)?,
                az_end: self.azimuth_at(window.end)?,
                elev_max: self.max_elevation_in(pass, window)?,
                tle: self.tle.clone(),
                valid_duration: true,
                overlapped: true,
                overlap_ratio: overlap_ratio(window.duration(), pass.duration()),
            });
        }
        Ok(result)
    }

    fn full_pass_window(
        &self,
        pass: &Pass,
        valid_duration: bool,
        overlapped: bool,
        overlap_ratio: f64,
    ) -> Window {
        Window {
            start: pass.rise_time,
            end: pass.set_time,
            az_start: pass.rise_az,
            az_end: pass.set_az,
            elev_max: pass.tca_alt,
            tle: self.tle.clone(),
            valid_duration,
            overlapped,
            overlap_ratio,
        }
    }

    /// Peak elevation inside part of a pass. Elevation climbs until TCA and
    /// falls after it, so the peak sits on the edge nearest TCA.
    fn max_elevation_in(&self, pass: &Pass, window: &Interval) -> Result<f64, PredictError> {
        if window.start > pass.tca_time {
            self.elevation_at(window.start)
        } else if window.end < pass.tca_time {
            self.elevation_at(window.end)
        } else {
            Ok(pass.tca_alt)
        }
    }

    fn azimuth_at(&self, at: DateTime<Utc>) -> Result<f64, PredictError> {
        self.propagator.azimuth_at(self.observer, self.satellite, at)
    }

    fn elevation_at(&self, at: DateTime<Utc>) -> Result<f64, PredictError> {
        self.propagator.elevation_at(self.observer, self.satellite, at)
    }

    fn over_min_duration(&self, duration: Duration) -> bool {
        duration > self.min_duration
    }
}

/// Share of the pass lost to conflicts, in [0, 1].
fn overlap_ratio(kept: Duration, full: Duration) -> f64 {
    let full_ms = full.num_milliseconds();
    if full_ms <= 0 {
        return 1.0;
    }
    (1.0 - kept.num_milliseconds() as f64 / full_ms as f64).clamp(0.0, 1.0)
}
