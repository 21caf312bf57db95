//! CLI entry point for the weather station aggregator.
//!
//! Each invocation checks which rolling wind direction aggregates are stale,
//! recomputes them from raw samples, and writes them back to InfluxDB.
//! Meant to be run on a schedule (cron, systemd timer).

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use wx_station_aggregator::{
    config::{InfluxConfig, PRODUCT_NAME, VERSION},
    engine::{AggregationRequest, RunOutcome, WindDirectionAggregator},
    influx::{InfluxClient, http_client},
    interval::TimestampConvention,
    store::SeriesStore,
    tags::TagFilter,
};

#[derive(Parser)]
#[command(name = PRODUCT_NAME, version = VERSION)]
#[command(about = "Aggregates weather station wind direction readings in InfluxDB", long_about = None)]
struct Cli {
    /// Name of the measurement to read
    #[arg(long, default_value = "weather_station")]
    measurement: String,

    /// Measurement to write aggregates to (default: <measurement>_agg)
    #[arg(long)]
    output_measurement: Option<String>,

    /// Comma-separated list of tag=value pairs to filter by and include in result measurements
    #[arg(long, default_value = "")]
    tags: String,

    /// Field holding wind direction in degrees; if not set, wind direction is not aggregated
    #[arg(long)]
    wind_dir_field: Option<String>,

    /// Field holding wind speed; required iff --wind-dir-field is given
    #[arg(long)]
    wind_speed_field: Option<String>,

    /// Where within its window each aggregate point is timestamped
    #[arg(long, value_enum, default_value_t = TimestampConvention::WindowEnd)]
    stamp_at: TimestampConvention,

    /// Gzip-compress write requests
    #[arg(long, default_value_t = false)]
    gzip: bool,

    /// Path to .env file to load environment variables from
    #[arg(long)]
    env: Option<PathBuf>,
}

/// Console logging plus an optional JSON rolling log file at
/// `LOG_FILE_PATH`. The returned guard must outlive the program's logging.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("RUST_LOG")
                .from_env_lossy(),
        );

    let (json_layer, guard) = match std::env::var("LOG_FILE_PATH") {
        Ok(log_file_path) => {
            let path = Path::new(&log_file_path);
            let log_dir = path.parent().unwrap_or(Path::new("logs"));
            let log_file_name = path
                .file_name()
                .unwrap_or(OsStr::new("wx_station_aggregator.log"));

            let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking_file)
                .with_filter(
                    EnvFilter::builder()
                        .with_default_directive(LevelFilter::DEBUG.into())
                        .with_env_var("RUST_LOG_JSON")
                        .from_env_lossy(),
                );
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

/// Turns the flags into a validated request, or `None` when there is
/// nothing to aggregate. Fails before any I/O on bad configuration.
fn build_request(cli: &Cli) -> Result<Option<AggregationRequest>> {
    let tags = TagFilter::parse(&cli.tags).context("Failed to parse tags")?;

    let (dir_field, speed_field) = match (&cli.wind_dir_field, &cli.wind_speed_field) {
        (None, _) => return Ok(None),
        (Some(_), None) => bail!("--wind-speed-field is required when --wind-dir-field is set"),
        (Some(dir), Some(speed)) => (dir, speed),
    };

    let mut builder = AggregationRequest::builder(&cli.measurement, dir_field)
        .weight_field(speed_field)
        .tags(tags)
        .convention(cli.stamp_at);
    if let Some(out) = &cli.output_measurement {
        builder = builder.output_measurement(out);
    }
    builder.build().map(Some)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load '{}'", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let _log_guard = init_logging();

    let request = build_request(&cli)?;
    let mut influx_config = InfluxConfig::from_env()?;
    influx_config.gzip = cli.gzip;

    let store = InfluxClient::new(http_client(&influx_config)?, &influx_config)?;
    store.ping().await?;

    let Some(request) = request else {
        info!("no data to write");
        return Ok(());
    };

    info!(
        measurement = request.source_measurement(),
        output = request.output_measurement(),
        tags = %request.tags(),
        "Starting wind direction aggregation"
    );

    let aggregator = WindDirectionAggregator::new(store, request);
    match aggregator.run().await.context("Wind direction aggregation failed")? {
        RunOutcome::NothingDue => info!("All aggregates are fresh"),
        RunOutcome::NoData => info!("no data to write"),
        RunOutcome::Written { points, intervals } => info!(
            points,
            intervals = ?intervals.iter().map(|i| i.as_str()).collect::<Vec<_>>(),
            "Aggregation complete"
        ),
        // already logged; the next run retries via the staleness check
        RunOutcome::WriteFailed { points, .. } => info!(points, "Aggregation not persisted"),
    }

    Ok(())
}
