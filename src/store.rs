//! Trait and types for talking to the time-series store that holds both
//! the raw samples and the aggregates.

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// The single series returned by a query, already checked for result and
/// series cardinality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub name: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

impl Series {
    /// Fails unless the series has exactly `expected` columns, in order.
    pub fn expect_columns(&self, expected: &[&str]) -> Result<()> {
        if self.columns.len() != expected.len() {
            bail!(
                "expected {} columns {:?}, got {:?}",
                expected.len(),
                expected,
                self.columns
            );
        }
        for (i, (got, want)) in self.columns.iter().zip(expected).enumerate() {
            if got != want {
                bail!("expected column {i} to be '{want}', got '{got}'");
            }
        }
        Ok(())
    }

    /// Fails unless the first column is `time`.
    pub fn expect_leading_time(&self) -> Result<()> {
        match self.columns.first().map(String::as_str) {
            Some("time") => Ok(()),
            Some(other) => bail!("expected first column to be 'time', got '{other}'"),
            None => bail!("expected first column to be 'time', got no columns"),
        }
    }
}

/// A field value on an output point.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Str(String),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

/// A single timestamped record to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub time: DateTime<Utc>,
}

/// Abstraction over the destination store (e.g., InfluxDB).
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Runs a query and returns its only series, or `None` when the query
    /// matched nothing.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, store-reported errors, and responses with
    /// more than one result or series.
    async fn query(&self, query: &str) -> Result<Option<Series>>;

    /// Writes all points as one batch.
    async fn write(&self, points: &[Point]) -> Result<()>;
}
