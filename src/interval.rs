//! The six rolling windows and their tuning table.
//!
//! Each [`Interval`] resolves to exactly one [`IntervalPolicy`]: the window
//! length, how stale its stored aggregate may get before it is recomputed,
//! and the standard-deviation cutoffs used for compass classification.

use anyhow::{Result, bail};
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::str::FromStr;

/// A supported rolling window, ordered from widest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interval {
    SixHours,
    ThreeHours,
    OneHour,
    ThirtyMinutes,
    FifteenMinutes,
    FiveMinutes,
}

/// Standard-deviation cutoffs, in degrees, for classifying a mean direction.
///
/// At or below `secondary` the label has 16-point resolution; above
/// `primary` it is `VAR`; in between it has 8-point resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispersionThresholds {
    pub secondary: f64,
    pub primary: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalPolicy {
    pub interval: Interval,
    window_secs: i64,
    max_staleness_secs: i64,
    pub thresholds: DispersionThresholds,
}

impl IntervalPolicy {
    pub fn window(&self) -> TimeDelta {
        TimeDelta::seconds(self.window_secs)
    }

    pub fn max_staleness(&self) -> TimeDelta {
        TimeDelta::seconds(self.max_staleness_secs)
    }
}

const fn policy(
    interval: Interval,
    window_secs: i64,
    max_staleness_secs: i64,
    secondary: f64,
    primary: f64,
) -> IntervalPolicy {
    IntervalPolicy {
        interval,
        window_secs,
        max_staleness_secs,
        thresholds: DispersionThresholds { secondary, primary },
    }
}

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;

/// The tuning table, in canonical (descending window) order.
static POLICIES: [IntervalPolicy; 6] = [
    policy(Interval::SixHours, 6 * HOUR, HOUR, 30.0, 38.0),
    policy(Interval::ThreeHours, 3 * HOUR, 40 * MINUTE, 35.0, 40.0),
    policy(Interval::OneHour, HOUR, 20 * MINUTE, 38.0, 43.0),
    policy(Interval::ThirtyMinutes, 30 * MINUTE, 10 * MINUTE, 44.0, 50.0),
    policy(Interval::FifteenMinutes, 15 * MINUTE, 5 * MINUTE, 50.0, 54.0),
    policy(Interval::FiveMinutes, 5 * MINUTE, 2 * MINUTE + 30, 56.0, 60.0),
];

impl Interval {
    /// All intervals, widest first.
    pub const ALL: [Interval; 6] = [
        Interval::SixHours,
        Interval::ThreeHours,
        Interval::OneHour,
        Interval::ThirtyMinutes,
        Interval::FifteenMinutes,
        Interval::FiveMinutes,
    ];

    pub fn policy(self) -> &'static IntervalPolicy {
        &POLICIES[self as usize]
    }

    pub fn window(self) -> TimeDelta {
        self.policy().window()
    }

    pub fn max_staleness(self) -> TimeDelta {
        self.policy().max_staleness()
    }

    pub fn thresholds(self) -> DispersionThresholds {
        self.policy().thresholds
    }

    /// Short identifier used in field names, e.g. `"15m"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Interval::SixHours => "6h",
            Interval::ThreeHours => "3h",
            Interval::OneHour => "1h",
            Interval::ThirtyMinutes => "30m",
            Interval::FifteenMinutes => "15m",
            Interval::FiveMinutes => "5m",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match Interval::ALL.into_iter().find(|i| i.as_str() == s) {
            Some(interval) => Ok(interval),
            None => bail!("unknown interval: {s}"),
        }
    }
}

/// Where within its window an aggregate point is timestamped.
///
/// The same value must drive both the write path and the staleness check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TimestampConvention {
    /// Stamp at the run time, i.e. the end of the window.
    #[default]
    WindowEnd,
    /// Stamp at the middle of the window.
    WindowMidpoint,
}

impl TimestampConvention {
    /// Timestamp to write for an aggregate of `interval` computed at `now`.
    pub fn point_time(self, now: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
        now - self.offset(interval)
    }

    /// Recovers the run time a stored point was computed at.
    pub fn reference_time(self, stored: DateTime<Utc>, interval: Interval) -> DateTime<Utc> {
        stored + self.offset(interval)
    }

    fn offset(self, interval: Interval) -> TimeDelta {
        match self {
            TimestampConvention::WindowEnd => TimeDelta::zero(),
            TimestampConvention::WindowMidpoint => interval.window() / 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_in_canonical_order() {
        for (i, interval) in Interval::ALL.iter().enumerate() {
            assert_eq!(POLICIES[i].interval, *interval);
        }
        for pair in Interval::ALL.windows(2) {
            assert!(pair[0].window() > pair[1].window());
        }
    }

    #[test]
    fn test_windows_and_staleness() {
        assert_eq!(Interval::SixHours.window(), TimeDelta::hours(6));
        assert_eq!(Interval::SixHours.max_staleness(), TimeDelta::hours(1));
        assert_eq!(Interval::OneHour.max_staleness(), TimeDelta::minutes(20));
        assert_eq!(Interval::FiveMinutes.window(), TimeDelta::minutes(5));
        assert_eq!(Interval::FiveMinutes.max_staleness(), TimeDelta::seconds(150));
    }

    #[test]
    fn test_staleness_never_exceeds_window() {
        for interval in Interval::ALL {
            assert!(interval.max_staleness() < interval.window());
        }
    }

    #[test]
    fn test_thresholds() {
        let expected = [
            (30.0, 38.0),
            (35.0, 40.0),
            (38.0, 43.0),
            (44.0, 50.0),
            (50.0, 54.0),
            (56.0, 60.0),
        ];
        for (interval, (secondary, primary)) in Interval::ALL.into_iter().zip(expected) {
            let t = interval.thresholds();
            assert_eq!((t.secondary, t.primary), (secondary, primary), "{interval}");
            assert!(t.secondary < t.primary);
        }
    }

    #[test]
    fn test_parse_identifiers() {
        for interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
        assert!("2h".parse::<Interval>().is_err());
    }

    #[test]
    fn test_midpoint_convention_round_trips() {
        let now = Utc::now();
        let conv = TimestampConvention::WindowMidpoint;
        let stamped = conv.point_time(now, Interval::OneHour);
        assert_eq!(now - stamped, TimeDelta::minutes(30));
        assert_eq!(conv.reference_time(stamped, Interval::OneHour), now);
    }

    #[test]
    fn test_window_end_convention_is_identity() {
        let now = Utc::now();
        let conv = TimestampConvention::WindowEnd;
        assert_eq!(conv.point_time(now, Interval::SixHours), now);
        assert_eq!(conv.reference_time(now, Interval::SixHours), now);
    }
}
