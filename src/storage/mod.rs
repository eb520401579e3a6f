pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use postgres::PostgresExecutor;
pub use sqlite::SqliteExecutor;
pub use trait_def::{ExecutionError, ExecutionResult, QueryExecutor};
