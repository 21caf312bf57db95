//! Wind direction aggregation run: plan, fetch, bucket, aggregate, write.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::aggregate::aggregate_all;
use crate::bucket::WindowBuckets;
use crate::config::aggregator_identity;
use crate::interval::{Interval, TimestampConvention};
use crate::output::AggregateWriter;
use crate::planner::due_intervals;
use crate::retry::RetryPolicy;
use crate::samples::fetch_samples;
use crate::store::SeriesStore;
use crate::tags::TagFilter;

/// What one aggregation run targets. Validated once on construction; the
/// components downstream rely on it without re-checking.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRequest {
    source_measurement: String,
    output_measurement: String,
    direction_field: String,
    weight_field: Option<String>,
    tags: TagFilter,
    convention: TimestampConvention,
    identity: String,
}

impl AggregationRequest {
    pub fn builder(
        source_measurement: impl Into<String>,
        direction_field: impl Into<String>,
    ) -> AggregationRequestBuilder {
        AggregationRequestBuilder {
            source_measurement: source_measurement.into(),
            direction_field: direction_field.into(),
            output_measurement: None,
            weight_field: None,
            tags: TagFilter::new(),
            convention: TimestampConvention::default(),
            identity: None,
        }
    }

    pub fn source_measurement(&self) -> &str {
        &self.source_measurement
    }

    pub fn output_measurement(&self) -> &str {
        &self.output_measurement
    }

    pub fn direction_field(&self) -> &str {
        &self.direction_field
    }

    pub fn weight_field(&self) -> Option<&str> {
        self.weight_field.as_deref()
    }

    pub fn tags(&self) -> &TagFilter {
        &self.tags
    }

    pub fn convention(&self) -> TimestampConvention {
        self.convention
    }

    /// Value of the `aggregator` tag on written points.
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

#[derive(Debug, Clone)]
pub struct AggregationRequestBuilder {
    source_measurement: String,
    direction_field: String,
    output_measurement: Option<String>,
    weight_field: Option<String>,
    tags: TagFilter,
    convention: TimestampConvention,
    identity: Option<String>,
}

impl AggregationRequestBuilder {
    /// Defaults to `<source>_agg`.
    pub fn output_measurement(mut self, name: impl Into<String>) -> Self {
        self.output_measurement = Some(name.into());
        self
    }

    /// Weight each direction by this field; unweighted when not set.
    pub fn weight_field(mut self, name: impl Into<String>) -> Self {
        self.weight_field = Some(name.into());
        self
    }

    pub fn tags(mut self, tags: TagFilter) -> Self {
        self.tags = tags;
        self
    }

    pub fn convention(mut self, convention: TimestampConvention) -> Self {
        self.convention = convention;
        self
    }

    /// Defaults to `<product>/<version>`.
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn build(self) -> Result<AggregationRequest> {
        if self.source_measurement.trim().is_empty() {
            bail!("measurement name must not be empty");
        }
        if self.direction_field.trim().is_empty() {
            bail!("wind direction field must not be empty");
        }
        if let Some(weight) = &self.weight_field {
            if weight.trim().is_empty() {
                bail!("wind speed field must not be empty");
            }
            if *weight == self.direction_field {
                bail!("wind speed field must differ from wind direction field");
            }
        }

        let output_measurement = self
            .output_measurement
            .unwrap_or_else(|| format!("{}_agg", self.source_measurement));
        if output_measurement.trim().is_empty() {
            bail!("output measurement name must not be empty");
        }

        Ok(AggregationRequest {
            source_measurement: self.source_measurement,
            output_measurement,
            direction_field: self.direction_field,
            weight_field: self.weight_field,
            tags: self.tags,
            convention: self.convention,
            identity: self.identity.unwrap_or_else(aggregator_identity),
        })
    }
}

/// How a run ended. Only the variants here are non-fatal; anything else is
/// returned as an error.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every stored aggregate is still fresh.
    NothingDue,
    /// Intervals were due but no window had usable samples.
    NoData,
    Written {
        points: usize,
        intervals: Vec<Interval>,
    },
    /// The write failed on every attempt. The next run's staleness check
    /// picks the intervals up again.
    WriteFailed {
        points: usize,
        error: anyhow::Error,
    },
}

pub struct WindDirectionAggregator<S> {
    store: S,
    request: AggregationRequest,
    retry: RetryPolicy,
}

impl<S: SeriesStore> WindDirectionAggregator<S> {
    pub fn new(store: S, request: AggregationRequest) -> Self {
        Self {
            store,
            request,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs once against the clock.
    pub async fn run(&self) -> Result<RunOutcome> {
        self.run_at(Utc::now()).await
    }

    /// Runs once with `now` as the single reference time for queries,
    /// windows and output timestamps.
    #[tracing::instrument(skip(self), fields(field = self.request.direction_field()))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunOutcome> {
        let req = &self.request;

        let due = due_intervals(&self.store, req, now).await?;
        if due.is_empty() {
            info!("No intervals to calculate");
            return Ok(RunOutcome::NothingDue);
        }

        let samples = fetch_samples(&self.store, req, &due, now).await?;
        if samples.is_empty() {
            info!("No data to aggregate");
            return Ok(RunOutcome::NoData);
        }

        let buckets = WindowBuckets::build(&samples, &due, now);
        let results = aggregate_all(&buckets);
        if results.is_empty() {
            info!("No data to aggregate");
            return Ok(RunOutcome::NoData);
        }

        let writer = AggregateWriter::new(req, self.retry);
        let points = writer.build_points(&results, now);
        let intervals: Vec<Interval> = results.iter().map(|r| r.interval).collect();

        match writer.write(&self.store, &points).await {
            Ok(()) => Ok(RunOutcome::Written {
                points: points.len(),
                intervals,
            }),
            Err(e) => {
                error!(error = %format!("{e:#}"), "Failed to write to InfluxDB");
                Ok(RunOutcome::WriteFailed {
                    points: points.len(),
                    error: e,
                })
            }
        }
    }
}
