use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use super::WeatherStore;
use crate::config::DbConfig;
use crate::error::{PipelineError, Result};
use crate::models::{LiveRecord, Observation, Prediction};

// ---

/// PostgreSQL-backed store; owns the connection pool for one run.
#[derive(Debug, Clone)]
pub struct PgWeatherStore {
    pool: PgPool,
}

impl PgWeatherStore {
    /// Open a pool using the configured connection parameters.
    ///
    /// sqlx keeps retrying a refused connection until the acquire timeout
    /// expires; either way the failure surfaces as [`PipelineError::Connection`].
    pub async fn connect(db: &DbConfig) -> Result<Self> {
        // ---
        info!("Attempting to connect to database: {}", db.target());

        let pool = PgPoolOptions::new()
            .max_connections(db.pool_max)
            .acquire_timeout(Duration::from_secs(db.connect_timeout_secs))
            .connect_with(db.connect_options())
            .await
            .map_err(|source| PipelineError::Connection {
                target: db.target(),
                source,
            })?;

        info!("Successfully connected to database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert one ingested observation into `weather_data`.
    pub async fn insert_observation(&self, obs: &Observation) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO weather_data (city, temperature, humidity, wind_speed, date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&obs.city)
        .bind(obs.temperature)
        .bind(obs.humidity)
        .bind(obs.wind_speed)
        .bind(obs.date)
        .execute(&self.pool)
        .await
        .map_err(|source| PipelineError::Write {
            context: "insert weather_data",
            source,
        })?;

        debug!("Stored observation for {} dated {}", obs.city, obs.date);
        Ok(())
    }

    /// Number of rows currently in `predictions`.
    pub async fn count_predictions(&self) -> Result<i64> {
        // ---
        sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| PipelineError::Query {
                context: "count predictions",
                source,
            })
    }

    /// Release all pooled connections.
    pub async fn close(self) {
        self.pool.close().await;
        debug!("Database pool closed");
    }
}

impl WeatherStore for PgWeatherStore {
    async fn fetch_live_records(&self) -> Result<Vec<LiveRecord>> {
        // ---
        let records = sqlx::query_as::<_, LiveRecord>(
            "SELECT city, temperature, humidity, wind_speed FROM weather_data",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|source| PipelineError::Query {
            context: "select weather_data",
            source,
        })?;

        info!("Fetched {} live records", records.len());
        Ok(records)
    }

    async fn append_predictions(&self, predictions: &[Prediction]) -> Result<u64> {
        // ---
        if predictions.is_empty() {
            info!("No predictions to store");
            return Ok(0);
        }

        let write = |source: sqlx::Error| PipelineError::Write {
            context: "append predictions",
            source,
        };

        let mut tx = self.pool.begin().await.map_err(write)?;
        let mut written = 0;
        for p in predictions {
            written += sqlx::query("INSERT INTO predictions (city, preds) VALUES ($1, $2)")
                .bind(&p.city)
                .bind(p.predicted_temp)
                .execute(&mut *tx)
                .await
                .map_err(write)?
                .rows_affected();
        }
        tx.commit().await.map_err(write)?;

        info!("Appended {} predictions", written);
        Ok(written)
    }
}
