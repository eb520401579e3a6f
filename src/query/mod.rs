pub mod builder;
pub mod ir;
pub mod sql;

pub use builder::{ConnectionAction, ConnectionStatus, ReportQueryBuilder};
pub use ir::{BindValue, Condition, Expr, Join, JoinKind, ReportQuery, SelectItem, TableRole};
pub use sql::{PostgresDialect, QueryRenderer, RenderedQuery, SqliteDialect};
