//! Next-day temperature forecasting pipeline.
//!
//! Trains a random forest on historical daily observations, then predicts
//! tomorrow's temperature for every row in the store's `weather_data` table
//! and appends the results to `predictions`.
//!
//! Modules follow the stages of a run:
//! - [`history`] loads the static CSV dataset
//! - [`features`] builds the supervised training set
//! - [`trainer`] fits, evaluates and optionally persists the model
//! - [`store`] reads live rows and appends predictions
//! - [`predictor`] maps live rows onto the model's feature schema
//! - [`ingest`] and [`schema`] prepare the store
//! - [`pipeline`] wires the stages together

pub mod config;
pub mod error;
pub mod features;
pub mod history;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod schema;
pub mod store;
pub mod trainer;

pub use config::Config;
pub use error::PipelineError;
pub use models::{FeatureVector, HistoricalRecord, LiveRecord, Observation, Prediction, TrainingExample};
pub use store::{PgWeatherStore, WeatherStore};
pub use trainer::TrainedModel;
