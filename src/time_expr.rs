use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// A point in time as written on the command line or in config.
///
/// Accepted forms:
/// - `T+10m`, `T-30s`: relative to the moment the expression is resolved
/// - `2030-01-12T10:00:00Z`, optionally followed by `+ 10m` / `- 10s`
/// - `2030-01-12 10:00:00` or `2030-01-12 10:00:00.250`, taken as UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeExpr {
    Relative(Duration),
    Absolute(DateTime<Utc>),
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

impl TimeExpr {
    /// `None` when a relative offset lands outside the representable range.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeExpr::Relative(d) => now.checked_add_signed(*d),
            TimeExpr::Absolute(dt) => Some(*dt),
        }
    }
}

impl FromStr for TimeExpr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.to_lowercase().starts_with('t') {
            let (neg, rest) = split_sign(&s[1..]);
            let dur = parse_duration(rest)?;
            return Ok(TimeExpr::Relative(if neg { -dur } else { dur }));
        }

        // Absolute with offset: 2030-01-12T10:00:00Z - 10s
        if let Some(idx) = s.rfind(['+', '-']) {
            if idx > 10 {
                if let Ok(base) = DateTime::parse_from_rfc3339(s[..idx].trim()) {
                    let (neg, rest) = split_sign(&s[idx..]);
                    let dur = parse_duration(rest)?;
                    let shifted = base
                        .with_timezone(&Utc)
                        .checked_add_signed(if neg { -dur } else { dur })
                        .ok_or_else(|| format!("time out of range: {}", s))?;
                    return Ok(TimeExpr::Absolute(shifted));
                }
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(TimeExpr::Absolute(dt.with_timezone(&Utc)));
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
            .map(|naive| TimeExpr::Absolute(naive.and_utc()))
            .ok_or_else(|| format!("unrecognised time: {}", s))
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

/// Serde helper for humantime durations such as `2m` or `48h 10m`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn relative_expressions_resolve_against_now() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let plus: TimeExpr = "T+10m".parse().unwrap();
        let minus: TimeExpr = "t-30s".parse().unwrap();
        assert_eq!(plus.resolve(now), Some(now + Duration::minutes(10)));
        assert_eq!(minus.resolve(now), Some(now - Duration::seconds(30)));
    }

    #[test]
    fn huge_offsets_do_not_overflow() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let far: TimeExpr = "T+1000000y".parse().unwrap();
        assert_eq!(far.resolve(now), None);
        assert!("2030-01-12T10:00:00Z + 1000000y".parse::<TimeExpr>().is_err());
    }

    #[test]
    fn absolute_expressions_with_offsets() {
        let base = Utc.with_ymd_and_hms(2030, 1, 12, 10, 0, 0).unwrap();
        let plain: TimeExpr = "2030-01-12T10:00:00Z".parse().unwrap();
        let shifted: TimeExpr = "2030-01-12T10:00:00Z - 10s".parse().unwrap();
        assert_eq!(plain, TimeExpr::Absolute(base));
        assert_eq!(shifted, TimeExpr::Absolute(base - Duration::seconds(10)));
    }

    #[test]
    fn naive_datetimes_are_utc() {
        let parsed: TimeExpr = "2030-01-12 10:00:00.500".parse().unwrap();
        let expected =
            Utc.with_ymd_and_hms(2030, 1, 12, 10, 0, 0).unwrap() + Duration::milliseconds(500);
        assert_eq!(parsed, TimeExpr::Absolute(expected));
        assert!("next tuesday".parse::<TimeExpr>().is_err());
    }
}
