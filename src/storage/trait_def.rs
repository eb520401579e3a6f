use crate::models::BucketedRow;
use crate::query::ReportQuery;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Runs report queries against a data store
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Create the event log and entity tables if missing
    async fn init(&self) -> Result<()>;

    /// Render, bind and run `query`, returning one row per result group
    async fn execute(&self, query: &ReportQuery) -> ExecutionResult<Vec<BucketedRow>>;
}
