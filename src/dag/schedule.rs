// src/dag/schedule.rs

//! Graph schedules: a fixed interval in whole minutes, or a cron expression
//! evaluated in a named timezone.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TaskdagError};

/// Longest interval the backend accepts (8 days).
pub const MAX_INTERVAL_MINUTES: u64 = 11_520;

/// Longest target completion interval for serverless tasks (24 hours).
pub const MAX_TARGET_COMPLETION_MINUTES: u64 = 1_440;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    Interval { minutes: u32 },
    Cron { expr: String, timezone: String },
}

impl Schedule {
    /// Interval schedule from a duration.
    ///
    /// The duration must be a whole number of minutes between 1 minute and
    /// 8 days.
    pub fn interval(every: Duration) -> Result<Self> {
        let minutes = whole_minutes(every, MAX_INTERVAL_MINUTES).ok_or_else(|| {
            TaskdagError::InvalidTask(format!(
                "the schedule interval must be a whole number of minutes between 1 and {} but got {} minute(s)",
                MAX_INTERVAL_MINUTES,
                every.as_secs_f64() / 60.0
            ))
        })?;
        Ok(Schedule::Interval { minutes })
    }

    pub fn cron(expr: impl Into<String>, timezone: impl Into<String>) -> Self {
        Schedule::Cron {
            expr: expr.into(),
            timezone: timezone.into(),
        }
    }

    /// Interval length, if this is an interval schedule.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Schedule::Interval { minutes } => Some(Duration::from_secs(u64::from(*minutes) * 60)),
            Schedule::Cron { .. } => None,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Interval { minutes } => write!(f, "{minutes} MINUTE"),
            Schedule::Cron { expr, timezone } => write!(f, "USING CRON {expr} {timezone}"),
        }
    }
}

impl PartialEq for Schedule {
    /// Cron expressions and timezones compare case-insensitively.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Schedule::Interval { minutes: a }, Schedule::Interval { minutes: b }) => a == b,
            (
                Schedule::Cron { expr: e1, timezone: t1 },
                Schedule::Cron { expr: e2, timezone: t2 },
            ) => e1.eq_ignore_ascii_case(e2) && t1.eq_ignore_ascii_case(t2),
            _ => false,
        }
    }
}

impl Eq for Schedule {}

/// Validate a serverless target completion interval and return it in minutes.
pub fn target_completion_minutes(interval: Duration) -> Result<u32> {
    whole_minutes(interval, MAX_TARGET_COMPLETION_MINUTES).ok_or_else(|| {
        TaskdagError::InvalidTask(format!(
            "the target completion interval must be a whole number of minutes between 1 and {} but got {} minute(s)",
            MAX_TARGET_COMPLETION_MINUTES,
            interval.as_secs_f64() / 60.0
        ))
    })
}

fn whole_minutes(d: Duration, max_minutes: u64) -> Option<u32> {
    if d.subsec_nanos() != 0 || d.as_secs() % 60 != 0 {
        return None;
    }
    let minutes = d.as_secs() / 60;
    if !(1..=max_minutes).contains(&minutes) {
        return None;
    }
    u32::try_from(minutes).ok()
}

/// Parse a duration string with a unit suffix (`ms`, `s`, `m`, `h`, `d`),
/// e.g. `"30m"` or `"1d"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |per_unit: u64| {
        value
            .checked_mul(per_unit)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", s))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        "d" => secs(60 * 60 * 24),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, h, or d",
            unit
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_must_be_whole_minutes_in_range() {
        assert_eq!(
            Schedule::interval(Duration::from_secs(600)).unwrap(),
            Schedule::Interval { minutes: 10 }
        );
        assert!(Schedule::interval(Duration::from_secs(90)).is_err());
        assert!(Schedule::interval(Duration::from_secs(30)).is_err());
        assert!(Schedule::interval(Duration::from_secs(11_521 * 60)).is_err());
        assert!(Schedule::interval(Duration::from_secs(11_520 * 60)).is_ok());
    }

    #[test]
    fn cron_comparison_ignores_case() {
        let a = Schedule::cron("0 0 10-20 * TUE,THU", "America/Los_Angeles");
        let b = Schedule::cron("0 0 10-20 * tue,thu", "america/los_angeles");
        assert_eq!(a, b);
        assert_ne!(a, Schedule::cron("0 0 10-20 * TUE,THU", "UTC"));
        assert_eq!(a.to_string(), "USING CRON 0 0 10-20 * TUE,THU America/Los_Angeles");
    }

    #[test]
    fn parse_duration_supports_day_suffix() {
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert!(parse_duration("15").is_err());
        assert!(parse_duration("5w").is_err());
    }

    #[test]
    fn parse_duration_rejects_overflowing_values() {
        let err = parse_duration("999999999999999999d").unwrap_err();
        assert!(err.contains("too large"), "got {err}");
        assert!(parse_duration("999999999999999999h").is_err());
        assert_eq!(
            parse_duration("999999999999999999s").unwrap(),
            Duration::from_secs(999_999_999_999_999_999)
        );
    }

    #[test]
    fn target_completion_caps_at_one_day() {
        assert_eq!(target_completion_minutes(Duration::from_secs(3600)).unwrap(), 60);
        assert!(target_completion_minutes(Duration::from_secs(1441 * 60)).is_err());
    }
}
