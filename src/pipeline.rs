//! Run orchestration: Load → Transform → Train → Fetch → Predict → Store.
//!
//! Training happens before the database is touched, so a bad dataset fails
//! the run without opening a connection. The pool is closed on every exit
//! path once it has been opened.

use chrono::Local;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::features::build_training_set;
use crate::history::load_history;
use crate::ingest::ingest_cities;
use crate::predictor;
use crate::schema::create_schema;
use crate::store::{PgWeatherStore, WeatherStore};
use crate::trainer::{train, TrainedModel};

// ---

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    // ---
    pub ingested: usize,
    pub fetched: usize,
    pub predicted: usize,
    pub appended: u64,
}

/// Train a fresh model from the historical dataset, or load a saved one when
/// `MODEL_IN` is configured. Saves the fresh model when `MODEL_OUT` is set.
pub fn prepare_model(cfg: &Config) -> Result<TrainedModel> {
    // ---
    if let Some(path) = &cfg.model_in {
        info!("Skipping training, loading {}", path.display());
        return TrainedModel::load(path);
    }

    let records = load_history(&cfg.history_csv)?;
    let examples = build_training_set(&records);
    let model = train(&examples)?;

    if let Some(path) = &cfg.model_out {
        model.save(path)?;
    }
    Ok(model)
}

/// Fetch every live record, predict, and append the results.
pub async fn predict_and_store<S: WeatherStore>(
    model: &TrainedModel,
    store: &S,
) -> Result<RunSummary> {
    // ---
    let live = store.fetch_live_records().await?;
    let predictions = predictor::predict(model, &live)?;
    let appended = store.append_predictions(&predictions).await?;

    Ok(RunSummary {
        ingested: 0,
        fetched: live.len(),
        predicted: predictions.len(),
        appended,
    })
}

/// Execute one complete run against PostgreSQL.
pub async fn run(cfg: &Config) -> Result<RunSummary> {
    // ---
    let model = prepare_model(cfg)?;

    let store = PgWeatherStore::connect(&cfg.db).await?;

    let outcome: Result<RunSummary> = async {
        create_schema(store.pool()).await?;

        let ingested = match &cfg.ingest {
            Some(ingest) => ingest_cities(ingest, &store, Local::now().date_naive()).await?,
            None => 0,
        };

        let summary = predict_and_store(&model, &store).await?;
        Ok(RunSummary { ingested, ..summary })
    }
    .await;

    store.close().await;

    let summary = outcome?;
    info!(
        "Run complete: ingested={} fetched={} predicted={} appended={}",
        summary.ingested, summary.fetched, summary.predicted, summary.appended
    );
    Ok(summary)
}
