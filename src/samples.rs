//! Raw direction samples and the single bulk query that loads them.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::circular::Degree;
use crate::engine::AggregationRequest;
use crate::influx::query::{quote_ident, time_literal};
use crate::influx::response::parse_time;
use crate::interval::Interval;
use crate::store::{Series, SeriesStore};

/// One reading: a clamped direction and, when aggregating weighted, its
/// non-negative weight (e.g. wind speed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub direction: Degree,
    pub weight: Option<f64>,
}

/// Query for every sample inside the widest due window, oldest first.
pub fn sample_query(req: &AggregationRequest, widest: Interval, now: DateTime<Utc>) -> String {
    let mut columns = quote_ident(req.direction_field());
    if let Some(weight) = req.weight_field() {
        columns.push_str(", ");
        columns.push_str(&quote_ident(weight));
    }
    format!(
        "SELECT time, {columns} FROM {} WHERE time >= {}{} ORDER BY time ASC",
        quote_ident(req.source_measurement()),
        time_literal(now - widest.window()),
        req.tags().where_clause(),
    )
}

fn parse_number(value: &Value, column: &str, row: usize) -> Result<f64> {
    match value.as_f64() {
        Some(v) if v.is_finite() => Ok(v),
        _ => bail!("row {row}: failed to parse {column}: expected a number, got {value}"),
    }
}

/// Validates the series layout and converts every row into a [`Sample`].
///
/// Any malformed row fails the whole batch.
pub fn parse_samples(series: &Series, req: &AggregationRequest) -> Result<Vec<Sample>> {
    let mut expected = vec!["time", req.direction_field()];
    if let Some(weight) = req.weight_field() {
        expected.push(weight);
    }
    series.expect_columns(&expected)?;

    series
        .values
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let time = parse_time(&row[0]).with_context(|| format!("row {i}"))?;
            let direction = parse_number(&row[1], req.direction_field(), i)?;
            let weight = match req.weight_field() {
                Some(column) => {
                    let w = parse_number(&row[2], column, i)?;
                    if w < 0.0 {
                        bail!("row {i}: {column} must not be negative, got {w}");
                    }
                    Some(w)
                }
                None => None,
            };
            Ok(Sample {
                time,
                direction: Degree(direction).clamped(),
                weight,
            })
        })
        .collect()
}

/// Loads all samples needed by `due` with one query.
///
/// Returns an empty vector when `due` is empty or nothing matched.
#[tracing::instrument(skip_all, fields(measurement = req.source_measurement()))]
pub async fn fetch_samples<S: SeriesStore + ?Sized>(
    store: &S,
    req: &AggregationRequest,
    due: &[Interval],
    now: DateTime<Utc>,
) -> Result<Vec<Sample>> {
    let Some(widest) = due.iter().copied().max_by_key(|i| i.window()) else {
        return Ok(Vec::new());
    };

    let q = sample_query(req, widest, now);
    let Some(series) = store.query(&q).await.context("fetching samples")? else {
        debug!(%widest, "Sample query matched nothing");
        return Ok(Vec::new());
    };

    let samples = parse_samples(&series, req)?;
    debug!(%widest, count = samples.len(), "Samples fetched");
    Ok(samples)
}
