//! Database schema management for `weatherflow-forecast`.
//!
//! Ensures the observation and prediction tables exist before the pipeline
//! reads or writes them. Applied once per run, right after connecting.

use sqlx::PgPool;

use crate::error::{PipelineError, Result};

// ---

/// Create the store's tables and indexes (idempotent).
///
/// `weather_data` holds one row per city observation written by the ingest
/// step; `predictions` is append-only. Safe to call on every run; no-op if
/// the objects already exist.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let ddl = |source: sqlx::Error| PipelineError::Query {
        context: "create schema",
        source,
    };

    let mut tx = pool.begin().await.map_err(ddl)?;

    // Live observations: today's temperature, tomorrow's humidity and wind
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_data (
            id          SERIAL PRIMARY KEY,
            city        VARCHAR(50)      NOT NULL,
            temperature DOUBLE PRECISION NOT NULL,
            humidity    DOUBLE PRECISION NOT NULL,
            wind_speed  DOUBLE PRECISION NOT NULL,
            date        DATE             NOT NULL,
            created_at  TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(ddl)?;

    // Forecast history, never updated in place
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            id          SERIAL PRIMARY KEY,
            city        VARCHAR(50)      NOT NULL,
            preds       DOUBLE PRECISION NOT NULL,
            created_at  TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(ddl)?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_data_city_date
            ON weather_data (city, date);
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(ddl)?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_predictions_city_created
            ON predictions (city, created_at);
        "#,
    )
    .execute(&mut *tx)
    .await
    .map_err(ddl)?;

    tx.commit().await.map_err(ddl)?;
    tracing::debug!("Schema verified");
    Ok(())
}
