use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Invalid partition or sampling setup, raised before any query runs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueryError {
    pub fn configuration(message: impl Into<String>) -> Self {
        QueryError::Configuration(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
