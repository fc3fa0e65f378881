//! Error kinds surfaced by the forecast pipeline.
//!
//! Nothing in the pipeline recovers from these locally. Every stage returns
//! a [`PipelineError`] and the binary turns it into a non-zero exit.

use std::path::PathBuf;

// ---

/// A failure in one of the pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Historical dataset is missing, unreadable or corrupt.
    #[error("cannot read historical dataset {}: {reason}", .path.display())]
    FileAccess { path: PathBuf, reason: String },

    /// An expected column is absent or a record violates the declared schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// The relational store could not be reached.
    #[error("failed to connect to database '{target}': {source}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// A read or DDL statement failed.
    #[error("query failed ({context}): {source}")]
    Query {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// The regressor could not be fitted, or a fitted one failed to predict.
    #[error("model error: {0}")]
    ModelFit(String),

    /// An append to the store failed.
    #[error("write failed ({context}): {source}")]
    Write {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Live observation ingest failed.
    #[error("ingest error: {0}")]
    Ingest(String),

    /// A persisted model file could not be saved or loaded.
    #[error("model file {}: {reason}", .path.display())]
    ModelIo { path: PathBuf, reason: String },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

impl PipelineError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        // ---
        PipelineError::FileAccess {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn model_io(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        // ---
        PipelineError::ModelIo {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        PipelineError::Ingest(e.to_string())
    }
}
