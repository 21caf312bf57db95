//! Splits fetched samples into one bucket per due interval.

use chrono::{DateTime, Utc};

use crate::interval::Interval;
use crate::samples::Sample;

/// Samples per interval, in the order the intervals were given.
///
/// Windows nest, so a sample can appear in several buckets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WindowBuckets {
    buckets: Vec<(Interval, Vec<Sample>)>,
}

impl WindowBuckets {
    /// Assigns each sample to every due window `[now - window, now]` it
    /// falls in, preserving sample order.
    pub fn build(samples: &[Sample], due: &[Interval], now: DateTime<Utc>) -> Self {
        let mut buckets: Vec<(Interval, Vec<Sample>)> =
            due.iter().map(|&i| (i, Vec::new())).collect();

        for sample in samples {
            let age = now - sample.time;
            if age < chrono::TimeDelta::zero() {
                continue;
            }
            for (interval, bucket) in buckets.iter_mut() {
                if age <= interval.window() {
                    bucket.push(*sample);
                }
            }
        }

        Self { buckets }
    }

    pub fn get(&self, interval: Interval) -> Option<&[Sample]> {
        self.buckets
            .iter()
            .find(|(i, _)| *i == interval)
            .map(|(_, b)| b.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Interval, &[Sample])> {
        self.buckets.iter().map(|(i, b)| (*i, b.as_slice()))
    }

    /// True when every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|(_, b)| b.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circular::Degree;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn sample(minutes_ago: i64, dir: f64) -> Sample {
        Sample {
            time: now() - TimeDelta::minutes(minutes_ago),
            direction: Degree(dir),
            weight: Some(1.0),
        }
    }

    #[test]
    fn test_windows_nest() {
        let samples = [sample(50, 1.0), sample(20, 2.0), sample(4, 3.0)];
        let due = [Interval::OneHour, Interval::ThirtyMinutes, Interval::FiveMinutes];
        let buckets = WindowBuckets::build(&samples, &due, now());

        assert_eq!(buckets.get(Interval::OneHour).unwrap().len(), 3);
        assert_eq!(buckets.get(Interval::ThirtyMinutes).unwrap().len(), 2);
        let five = buckets.get(Interval::FiveMinutes).unwrap();
        assert_eq!(five.len(), 1);
        assert_eq!(five[0].direction, Degree(3.0));
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let samples = [sample(5, 1.0)];
        let buckets = WindowBuckets::build(&samples, &[Interval::FiveMinutes], now());
        assert_eq!(buckets.get(Interval::FiveMinutes).unwrap().len(), 1);
    }

    #[test]
    fn test_future_samples_are_excluded() {
        let samples = [sample(-1, 1.0)];
        let buckets = WindowBuckets::build(&samples, &[Interval::FiveMinutes], now());
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_empty_bucket_is_kept() {
        let samples = [sample(50, 1.0)];
        let due = [Interval::OneHour, Interval::FifteenMinutes];
        let buckets = WindowBuckets::build(&samples, &due, now());

        assert!(!buckets.is_empty());
        assert_eq!(buckets.get(Interval::FifteenMinutes), Some(&[][..]));
        assert_eq!(buckets.get(Interval::SixHours), None);
        let order: Vec<_> = buckets.iter().map(|(i, _)| i).collect();
        assert_eq!(order, due);
    }
}
