//! Decides which intervals need a fresh aggregate this run.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::engine::AggregationRequest;
use crate::influx::query::{quote_ident, time_literal};
use crate::influx::response::parse_time;
use crate::interval::{Interval, TimestampConvention};
use crate::output::mean_field;
use crate::store::{Series, SeriesStore};

/// Query for the most recent stored mean of `interval`.
pub fn staleness_query(req: &AggregationRequest, interval: Interval, now: DateTime<Utc>) -> String {
    format!(
        "SELECT time, {} FROM {} WHERE time >= {}{} ORDER BY time DESC LIMIT 1",
        quote_ident(&mean_field(req.direction_field(), interval)),
        quote_ident(req.output_measurement()),
        time_literal(now - interval.window()),
        req.tags().where_clause(),
    )
}

/// Extracts the timestamp of the newest stored point, if any.
fn latest_time(series: Option<Series>) -> Result<Option<DateTime<Utc>>> {
    let Some(series) = series else {
        return Ok(None);
    };
    series.expect_leading_time()?;
    match series.values.as_slice() {
        [] => Ok(None),
        [row] => Ok(Some(parse_time(&row[0])?)),
        rows => bail!("expected at most 1 row, got {}", rows.len()),
    }
}

/// Whether an interval whose newest point is stamped `latest` is due.
pub fn is_due(
    latest: Option<DateTime<Utc>>,
    interval: Interval,
    convention: TimestampConvention,
    now: DateTime<Utc>,
) -> bool {
    match latest {
        None => true,
        Some(stamped) => {
            now - convention.reference_time(stamped, interval) > interval.max_staleness()
        }
    }
}

/// Probes the store once per interval and returns the ones due for
/// recomputation, widest first.
#[tracing::instrument(skip_all, fields(measurement = req.output_measurement()))]
pub async fn due_intervals<S: SeriesStore + ?Sized>(
    store: &S,
    req: &AggregationRequest,
    now: DateTime<Utc>,
) -> Result<Vec<Interval>> {
    let mut due = Vec::new();

    for interval in Interval::ALL {
        let q = staleness_query(req, interval, now);
        let series = store
            .query(&q)
            .await
            .with_context(|| format!("checking staleness of {interval} aggregate"))?;
        let latest = latest_time(series)
            .with_context(|| format!("reading latest {interval} aggregate"))?;

        let interval_due = is_due(latest, interval, req.convention(), now);
        debug!(%interval, ?latest, due = interval_due, "Staleness check");
        if interval_due {
            due.push(interval);
        }
    }

    info!(
        due = ?due.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
        "Intervals due for recomputation"
    );
    Ok(due)
}
