use crate::storage::ExecutionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// Malformed or contradictory report parameters
    #[error("invalid report parameter: {0}")]
    InvalidParameter(String),
    /// The data store failed to run the report query
    #[error("report query failed: {0}")]
    Execution(#[from] ExecutionError),
    /// A returned row could not be placed into a bucket
    #[error("malformed result row: {0}")]
    MalformedRow(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
