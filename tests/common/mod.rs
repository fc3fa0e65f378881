//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::Path;

use chrono::{Days, NaiveDate};
use tempfile::NamedTempFile;
use weatherflow_forecast::config::DbConfig;
use weatherflow_forecast::error::Result;
use weatherflow_forecast::{Config, LiveRecord, Prediction, WeatherStore};

// ---

/// In-memory stand-in for the relational store.
#[derive(Default)]
pub struct MemoryStore {
    pub live: Vec<LiveRecord>,
    pub predictions: RefCell<Vec<Prediction>>,
    pub fetches: Cell<usize>,
}

impl MemoryStore {
    pub fn with_live(live: Vec<LiveRecord>) -> Self {
        Self {
            live,
            ..Default::default()
        }
    }
}

impl WeatherStore for MemoryStore {
    async fn fetch_live_records(&self) -> Result<Vec<LiveRecord>> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.live.clone())
    }

    async fn append_predictions(&self, predictions: &[Prediction]) -> Result<u64> {
        self.predictions.borrow_mut().extend_from_slice(predictions);
        Ok(predictions.len() as u64)
    }
}

pub fn live(city: &str, temperature: f64, humidity: f64, wind_speed: f64) -> LiveRecord {
    LiveRecord {
        city: city.to_string(),
        temperature,
        humidity,
        wind_speed,
    }
}

/// Daily history with a seasonal-looking temperature swing.
pub fn history_csv(days: u64) -> NamedTempFile {
    // ---
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "name,datetime,temp,humidity,windspeed").unwrap();

    let start = NaiveDate::from_ymd_opt(2022, 2, 1).unwrap();
    for i in 0..days {
        let date = start.checked_add_days(Days::new(i)).unwrap();
        let temp = 26.0 + ((i % 14) as f64 - 7.0) * 0.6;
        let humidity = 60.0 + ((i * 5) % 25) as f64;
        let windspeed = 8.0 + ((i * 3) % 11) as f64;
        writeln!(file, "chennai,{},{:.1},{:.1},{:.1}", date, temp, humidity, windspeed).unwrap();
    }
    file
}

pub fn write_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

pub fn config_for(history: &Path) -> Config {
    // ---
    Config {
        history_csv: history.to_path_buf(),
        db: DbConfig {
            host: "localhost".to_string(),
            port: 5432,
            user: "forecast".to_string(),
            password: "unused".to_string(),
            database: "weather_db".to_string(),
            pool_max: 1,
            connect_timeout_secs: 1,
        },
        model_in: None,
        model_out: None,
        ingest: None,
    }
}
