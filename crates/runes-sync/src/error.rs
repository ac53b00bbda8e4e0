use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("datasource error: {0}")]
    Datasource(String),
    #[error("processor error: {0}")]
    Processor(String),
    #[error("failed to persist block {height}: {reason}")]
    Persist { height: u64, reason: String },
    #[error("no common ancestor within {max_depth} blocks below height {height}")]
    ReorgTooDeep { height: u64, max_depth: u64 },
    #[error("subscription closed without completing")]
    SubscriptionClosed,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("sync task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }

    /// Errors that end [`crate::RunesSync::run`] rather than the current round.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Persist { .. } | SyncError::ReorgTooDeep { .. }
        )
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(err: anyhow::Error) -> Self {
        SyncError::Processor(format!("{err:#}"))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
