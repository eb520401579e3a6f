//! Conversion statistics for ad delivery reports
//!
//! Builds the aggregate conversion query for a report request, runs it
//! through a [`storage::QueryExecutor`], moves the hourly buckets into the
//! reporting timezone and merges them into the caller's report rows.

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod report;
pub mod storage;
pub mod timezone;

pub use error::{ReportError, ReportResult};
pub use models::{Granularity, QueryParameterSet, ResultAccumulator};
pub use report::ConversionStats;
