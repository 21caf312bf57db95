//! JSON body returned by the InfluxDB 1.x `/query` endpoint.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::store::Series;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<RawSeries>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default)]
    name: String,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Decodes a single-statement query response into its only series.
///
/// # Errors
///
/// Returns an error for undecodable JSON, store-reported errors, more than
/// one result or series, and rows whose width differs from the columns.
pub fn parse_query_response(body: &[u8]) -> Result<Option<Series>> {
    let resp: QueryResponse =
        serde_json::from_slice(body).context("decoding InfluxDB query response")?;

    if let Some(err) = resp.error {
        bail!("InfluxDB query failed: {err}");
    }
    if resp.results.len() > 1 {
        bail!("expected 1 result, got {}", resp.results.len());
    }
    let Some(result) = resp.results.into_iter().next() else {
        return Ok(None);
    };
    if let Some(err) = result.error {
        bail!("InfluxDB query failed: {err}");
    }
    if result.series.len() > 1 {
        bail!("expected 1 series, got {}", result.series.len());
    }
    let Some(raw) = result.series.into_iter().next() else {
        return Ok(None);
    };

    for (i, row) in raw.values.iter().enumerate() {
        if row.len() != raw.columns.len() {
            bail!(
                "row {i} has {} values but series has {} columns",
                row.len(),
                raw.columns.len()
            );
        }
    }

    Ok(Some(Series {
        name: raw.name,
        columns: raw.columns,
        values: raw.values,
    }))
}

/// Parses an RFC 3339 `time` column value.
pub fn parse_time(value: &Value) -> Result<DateTime<Utc>> {
    let Some(s) = value.as_str() else {
        bail!("expected time to be an RFC 3339 string, got {value}");
    };
    let t = DateTime::parse_from_rfc3339(s).with_context(|| format!("failed to parse time '{s}'"))?;
    Ok(t.with_timezone(&Utc))
}
