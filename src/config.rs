//! Configuration loader for the `weatherflow-forecast` pipeline.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Components receive the pieces they need from the
//! resulting [`Config`]; nothing else in the crate reads the environment.
//!
use std::env;
use std::fmt;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use sqlx::postgres::PgConnectOptions;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Read an optional, non-empty string environment variable.
macro_rules! optional_env {
    ($var_name:expr) => {
        env::var($var_name).ok().filter(|v| !v.trim().is_empty())
    };
}

pub const DEFAULT_VISUAL_CROSSING_URL: &str =
    "https://weather.visualcrossing.com/VisualCrossingWebServices/rest/services/timeline";

/// Strongly typed pipeline configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the run.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Historical observations used for training.
    pub history_csv: PathBuf,

    /// Relational store holding `weather_data` and `predictions`.
    pub db: DbConfig,

    /// Load a saved model instead of training.
    pub model_in: Option<PathBuf>,

    /// Save the freshly trained model here.
    pub model_out: Option<PathBuf>,

    /// Live observation ingest; `None` skips the step.
    pub ingest: Option<IngestConfig>,
}

/// Connection parameters for the PostgreSQL store.
#[derive(Clone)]
pub struct DbConfig {
    // ---
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Maximum number of database connections in the pool.
    pub pool_max: u32,

    /// How long to keep trying to open a connection before giving up.
    pub connect_timeout_secs: u64,
}

/// Visual Crossing timeline API settings for the ingest step.
#[derive(Clone)]
pub struct IngestConfig {
    // ---
    pub api_url: String,
    pub api_key: String,
    pub cities: Vec<String>,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `HISTORY_CSV` – path to the historical dataset
/// - `WEATHER_DB_HOST`, `WEATHER_DB_USER`, `WEATHER_DB_PASSWORD`, `WEATHER_DB_NAME`
///
/// Optional:
/// - `WEATHER_DB_PORT` – database port (default: 5432)
/// - `DB_POOL_MAX` – max DB connections (default: 1)
/// - `DB_CONNECT_TIMEOUT_SECS` – give up connecting after this long (default: 30)
/// - `MODEL_IN` / `MODEL_OUT` – load or save the fitted model
/// - `INGEST_CITIES` – comma-separated cities to ingest before predicting;
///   requires `VISUAL_CROSSING_API_KEY`, honours `VISUAL_CROSSING_URL`
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let history_csv = PathBuf::from(require_env!("HISTORY_CSV"));

    let db = DbConfig {
        host: require_env!("WEATHER_DB_HOST"),
        port: parse_env!("WEATHER_DB_PORT", u16, 5432),
        user: require_env!("WEATHER_DB_USER"),
        password: require_env!("WEATHER_DB_PASSWORD"),
        database: require_env!("WEATHER_DB_NAME"),
        pool_max: parse_env!("DB_POOL_MAX", u32, 1),
        connect_timeout_secs: parse_env!("DB_CONNECT_TIMEOUT_SECS", u64, 30),
    };

    let model_in = optional_env!("MODEL_IN").map(PathBuf::from);
    let model_out = optional_env!("MODEL_OUT").map(PathBuf::from);

    let ingest = match optional_env!("INGEST_CITIES") {
        Some(list) => Some(IngestConfig {
            api_url: optional_env!("VISUAL_CROSSING_URL")
                .unwrap_or_else(|| DEFAULT_VISUAL_CROSSING_URL.to_string()),
            api_key: require_env!("VISUAL_CROSSING_API_KEY"),
            cities: parse_city_list(&list),
        }),
        None => None,
    };

    Ok(Config {
        history_csv,
        db,
        model_in,
        model_out,
        ingest,
    })
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_city_list(raw: &str) -> Vec<String> {
    // ---
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

impl DbConfig {
    /// Connection options for sqlx; the password never leaves this struct as text.
    pub fn connect_options(&self) -> PgConnectOptions {
        // ---
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }

    /// `user@host:port/database`, safe to log.
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"****")
            .field("database", &self.database)
            .field("pool_max", &self.pool_max)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        f.debug_struct("IngestConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"****")
            .field("cities", &self.cities)
            .finish()
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password and API key while showing all other
    /// configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string())
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  HISTORY_CSV    : {}", self.history_csv.display());
        tracing::info!("  WEATHER_DB     : {}", self.db.target());
        tracing::info!("  DB_POOL_MAX    : {}", self.db.pool_max);
        tracing::info!("  DB_TIMEOUT     : {}s", self.db.connect_timeout_secs);
        tracing::info!("  MODEL_IN       : {}", show(&self.model_in));
        tracing::info!("  MODEL_OUT      : {}", show(&self.model_out));
        match &self.ingest {
            Some(ingest) => {
                tracing::info!("  INGEST_CITIES  : {}", ingest.cities.join(", "));
                tracing::info!("  INGEST_API_URL : {}", ingest.api_url);
            }
            None => tracing::info!("  INGEST_CITIES  : -"),
        }
    }
}
