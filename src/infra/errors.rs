// src/infra/errors.rs — Error types for the timesheet bot

use std::time::Duration;

use thiserror::Error;

use crate::timesheet::submission::ValidationReport;

#[derive(Error, Debug)]
pub enum TimesheetError {
    // User errors (session left intact for correction)
    #[error("Timesheet is incomplete: {0}")]
    Validation(ValidationReport),

    // Infra (retriable)
    #[error("{operation} timed out after {}s", elapsed.as_secs())]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("Bot connector returned {status}: {message}")]
    Connector { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store is unavailable: {0}")]
    StoreUnavailable(String),

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TimesheetError {
    pub fn is_retriable(&self) -> bool {
        match self {
            TimesheetError::Timeout { .. } | TimesheetError::StoreUnavailable(_) => true,
            TimesheetError::Connector { status, .. } => *status == 429 || *status >= 500,
            TimesheetError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Run `fut` under a deadline, mapping expiry to [`TimesheetError::Timeout`].
pub async fn with_timeout<T, F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, TimesheetError>
where
    F: std::future::Future<Output = Result<T, TimesheetError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", operation, limit);
            Err(TimesheetError::Timeout {
                operation,
                elapsed: limit,
            })
        }
    }
}
