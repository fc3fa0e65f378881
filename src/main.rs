//! Application entry point for the `weatherflow-forecast` batch job.
//!
//! This binary runs the forecast pipeline once, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Training the model (or loading a saved one)
//! - Connecting to PostgreSQL and creating the schema if it does not exist
//! - Optionally ingesting live observations for the configured cities
//! - Predicting every stored observation and appending the results
//!
//! # Environment Variables
//! - `HISTORY_CSV` (**required**) – historical dataset path
//! - `WEATHER_DB_HOST`, `WEATHER_DB_USER`, `WEATHER_DB_PASSWORD`,
//!   `WEATHER_DB_NAME` (**required**) – store connection parameters
//! - `FORECAST_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `FORECAST_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the complete list. Exits non-zero on any failure.
use std::{env, io::IsTerminal};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::Instrument;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use uuid::Uuid;

use weatherflow_forecast::{config, pipeline};

// ---

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let span = tracing::info_span!("forecast_run", run_id = %Uuid::new_v4());
    pipeline::run(&cfg)
        .instrument(span)
        .await
        .context("forecast run failed")?;

    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `FORECAST_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `FORECAST_LOG_LEVEL` env var
///
/// Called once at startup before any logging macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("FORECAST_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to FORECAST_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("FORECAST_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
