//! Relational store gateway.
//!
//! The pipeline reads live observations and appends predictions through the
//! [`WeatherStore`] trait; [`PgWeatherStore`] is the PostgreSQL implementation
//! used by the binary.

use crate::error::Result;
use crate::models::{LiveRecord, Prediction};

mod postgres;

pub use postgres::PgWeatherStore;

// ---

/// Read side and append-only write side of the weather store.
#[allow(async_fn_in_trait)]
pub trait WeatherStore {
    /// Full, unconditional read of `weather_data` in storage order.
    async fn fetch_live_records(&self) -> Result<Vec<LiveRecord>>;

    /// Append every prediction as a new row; returns the number of rows written.
    ///
    /// Existing rows are never touched, so repeated runs accumulate.
    async fn append_predictions(&self, predictions: &[Prediction]) -> Result<u64>;
}
