//! Circular mean, dispersion and compass classification per window.

use std::fmt;
use tracing::{info, warn};

use crate::bucket::WindowBuckets;
use crate::circular::{self, Degree, DirectionPrecision, direction_str};
use crate::interval::{DispersionThresholds, Interval};
use crate::samples::Sample;

/// Label reported for directions too scattered to summarize.
pub const VARIABLE_LABEL: &str = "VAR";

/// Compass summary of a window's mean direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionLabel {
    /// 16-point label (N, NNE, ...), for steady directions.
    Fine(&'static str),
    /// 8-point label (N, NE, ...), for moderately scattered directions.
    Coarse(&'static str),
    /// Too scattered to summarize.
    Variable,
}

impl DirectionLabel {
    /// Picks the label resolution from the dispersion: fine at or below the
    /// secondary cutoff, coarse up to the primary cutoff, variable above it.
    pub fn classify(mean: Degree, std_dev: f64, thresholds: DispersionThresholds) -> Self {
        if std_dev > thresholds.primary {
            DirectionLabel::Variable
        } else if std_dev > thresholds.secondary {
            DirectionLabel::Coarse(direction_str(mean, DirectionPrecision::Intercardinal))
        } else {
            DirectionLabel::Fine(direction_str(
                mean,
                DirectionPrecision::SecondaryIntercardinal,
            ))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionLabel::Fine(s) | DirectionLabel::Coarse(s) => *s,
            DirectionLabel::Variable => VARIABLE_LABEL,
        }
    }
}

impl fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub interval: Interval,
    pub mean: Degree,
    pub std_dev: f64,
    pub label: DirectionLabel,
    pub samples: usize,
}

/// Aggregates one bucket. Weighted when every sample carries a weight.
///
/// Returns `None` for an empty bucket or one whose weights sum to zero.
pub fn aggregate_bucket(interval: Interval, samples: &[Sample]) -> Option<AggregateResult> {
    if samples.is_empty() {
        return None;
    }

    let angles: Vec<Degree> = samples.iter().map(|s| s.direction).collect();
    let weights: Option<Vec<f64>> = samples.iter().map(|s| s.weight).collect();

    let (mean, std_dev) = match &weights {
        Some(w) => (
            circular::weighted_mean(&angles, w)?,
            circular::weighted_std_dev(&angles, w)?,
        ),
        None => (circular::mean(&angles)?, circular::std_dev(&angles)?),
    };

    Some(AggregateResult {
        interval,
        mean,
        std_dev,
        label: DirectionLabel::classify(mean, std_dev, interval.thresholds()),
        samples: samples.len(),
    })
}

/// Aggregates every non-empty bucket, in bucket order.
pub fn aggregate_all(buckets: &WindowBuckets) -> Vec<AggregateResult> {
    let mut results = Vec::new();
    for (interval, samples) in buckets.iter() {
        if samples.is_empty() {
            info!(%interval, "No samples in window, skipping");
            continue;
        }
        match aggregate_bucket(interval, samples) {
            Some(result) => {
                info!(
                    %interval,
                    samples = result.samples,
                    mean = result.mean.value(),
                    std_dev = result.std_dev,
                    label = %result.label,
                    "Window aggregated"
                );
                results.push(result);
            }
            None => {
                warn!(%interval, samples = samples.len(), "Window weights sum to zero, skipping");
            }
        }
    }
    results
}
