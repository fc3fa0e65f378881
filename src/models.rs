//! Record types shared by the pipeline stages.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ---

/// Column names of the model's input, in the order the forest expects them.
pub const FEATURE_SCHEMA: [&str; 3] = ["temp", "next_humidity", "next_windspeed"];

/// One row of the historical dataset.
///
/// Weather values are optional: a blank cell in the source file marks a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    // ---
    pub timestamp: NaiveDateTime,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub windspeed: Option<f64>,
}

impl HistoricalRecord {
    /// True when every weather value is present.
    pub fn is_complete(&self) -> bool {
        self.temp.is_some() && self.humidity.is_some() && self.windspeed.is_some()
    }
}

/// Model input: today's temperature with tomorrow's humidity and wind speed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    // ---
    pub temp: f64,
    pub next_humidity: f64,
    pub next_windspeed: f64,
}

impl FeatureVector {
    /// Values in [`FEATURE_SCHEMA`] order.
    pub fn to_row(self) -> Vec<f64> {
        vec![self.temp, self.next_humidity, self.next_windspeed]
    }
}

/// One supervised example built from two adjacent historical records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingExample {
    // ---
    pub features: FeatureVector,
    /// Temperature of the following record.
    pub label: f64,
}

/// A current observation read from `weather_data`.
///
/// `humidity` and `wind_speed` hold *tomorrow's* forecast values. The ingest
/// step writes them that way and the predictor relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LiveRecord {
    // ---
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
}

impl LiveRecord {
    /// Project into the training feature schema without transforming values.
    pub fn to_features(&self) -> FeatureVector {
        // ---
        FeatureVector {
            temp: self.temperature,
            next_humidity: self.humidity,
            next_windspeed: self.wind_speed,
        }
    }
}

/// A row produced by the ingest step for `weather_data`.
///
/// Mixes days on purpose: `temperature` is observed today while `humidity`
/// and `wind_speed` come from tomorrow's forecast, dated `date` (tomorrow).
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    // ---
    pub city: String,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub date: NaiveDate,
}

/// A forecast destined for the `predictions` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Prediction {
    // ---
    pub city: String,
    #[sqlx(rename = "preds")]
    pub predicted_temp: f64,
}
