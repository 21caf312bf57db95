//! Output point construction and persistence for window aggregates.
//!
//! Field names are `<field>_mean_<iv>`, `<field>_stddev_<iv>` and
//! `<field>_mean_intercardinal_<iv>`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::aggregate::AggregateResult;
use crate::engine::AggregationRequest;
use crate::interval::{Interval, TimestampConvention};
use crate::retry::RetryPolicy;
use crate::store::{FieldValue, Point, SeriesStore};

pub fn mean_field(field: &str, interval: Interval) -> String {
    format!("{field}_mean_{interval}")
}

pub fn stddev_field(field: &str, interval: Interval) -> String {
    format!("{field}_stddev_{interval}")
}

pub fn label_field(field: &str, interval: Interval) -> String {
    format!("{field}_mean_intercardinal_{interval}")
}

/// Builds and writes aggregate points for one request.
pub struct AggregateWriter {
    measurement: String,
    direction_field: String,
    tags: BTreeMap<String, String>,
    convention: TimestampConvention,
    retry: RetryPolicy,
}

impl AggregateWriter {
    pub fn new(req: &AggregationRequest, retry: RetryPolicy) -> Self {
        Self {
            measurement: req.output_measurement().to_string(),
            direction_field: req.direction_field().to_string(),
            tags: req.tags().with_identity(req.identity()),
            convention: req.convention(),
            retry,
        }
    }

    /// Groups results into points by timestamp: one point for the whole run
    /// when stamping at the window end, one per interval at the midpoint.
    pub fn build_points(&self, results: &[AggregateResult], now: DateTime<Utc>) -> Vec<Point> {
        let mut by_time: BTreeMap<DateTime<Utc>, BTreeMap<String, FieldValue>> = BTreeMap::new();

        for r in results {
            let time = self.convention.point_time(now, r.interval);
            let fields = by_time.entry(time).or_default();
            let f = &self.direction_field;
            fields.insert(mean_field(f, r.interval), r.mean.value().into());
            fields.insert(stddev_field(f, r.interval), r.std_dev.into());
            fields.insert(label_field(f, r.interval), r.label.as_str().into());
        }

        by_time
            .into_iter()
            .map(|(time, fields)| Point {
                measurement: self.measurement.clone(),
                tags: self.tags.clone(),
                fields,
                time,
            })
            .collect()
    }

    /// Writes all points as one batch, retrying the whole batch on failure.
    pub async fn write<S: SeriesStore + ?Sized>(&self, store: &S, points: &[Point]) -> Result<()> {
        for point in points {
            debug!("{:#?}", point);
        }
        self.retry
            .run("InfluxDB write", || store.write(points))
            .await?;
        info!(
            points = points.len(),
            measurement = %self.measurement,
            "Aggregates written"
        );
        Ok(())
    }
}
