//! Historical dataset loader.
//!
//! Reads the static CSV export of daily observations. The file must carry a
//! `datetime` column plus `temp`, `humidity` and `windspeed`; any other
//! columns are ignored. Column names are matched exactly.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::models::HistoricalRecord;

// ---

pub const TIMESTAMP_COLUMN: &str = "datetime";

/// Columns that must be present in the header row.
pub const REQUIRED_COLUMNS: [&str; 4] = [TIMESTAMP_COLUMN, "temp", "humidity", "windspeed"];

/// Raw CSV row as declared by the export; blank cells deserialize to `None`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    // ---
    datetime: String,
    temp: Option<f64>,
    humidity: Option<f64>,
    windspeed: Option<f64>,
}

/// Load the historical dataset, ordered by timestamp.
///
/// Fails with [`PipelineError::FileAccess`] when the file cannot be opened or
/// a cell cannot be parsed, and with [`PipelineError::Schema`] when a required
/// column is missing or a timestamp appears twice.
pub fn load_history(path: &Path) -> Result<Vec<HistoricalRecord>> {
    // ---
    let file = File::open(path).map_err(|e| PipelineError::file_access(path, e))?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::file_access(path, e))?
        .clone();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema(format!(
            "{} is missing required column(s): {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| PipelineError::file_access(path, e))?;
        let timestamp = parse_timestamp(&row.datetime).ok_or_else(|| {
            PipelineError::file_access(
                path,
                format!("row {}: unparsable timestamp '{}'", i + 1, row.datetime),
            )
        })?;

        records.push(HistoricalRecord {
            timestamp,
            temp: row.temp,
            humidity: row.humidity,
            windspeed: row.windspeed,
        });
    }

    records.sort_by_key(|r| r.timestamp);

    if let Some(pair) = records.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
        return Err(PipelineError::Schema(format!(
            "duplicate timestamp {} in {}",
            pair[0].timestamp,
            path.display()
        )));
    }

    tracing::info!(
        "Loaded {} historical records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Accepts plain dates (midnight) or ISO-8601 local date-times.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    // ---
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}
