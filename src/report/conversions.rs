//! Conversion statistics for delivery reports
//!
//! One call runs a single build → execute → normalize → merge cycle. Cycles
//! for other statistic sources may run before or after against the same
//! accumulator; a failed cycle leaves it exactly as it found it.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, TableNames};
use crate::error::ReportResult;
use crate::models::{BucketedRow, Granularity, QueryParameterSet, ResultAccumulator};
use crate::query::ReportQueryBuilder;
use crate::report::merge::merge;
use crate::report::normalize::TimeBucketNormalizer;
use crate::storage::QueryExecutor;
use chrono_tz::Tz;

pub struct ConversionStats {
    executor: Arc<dyn QueryExecutor>,
    builder: ReportQueryBuilder,
    normalizer: TimeBucketNormalizer,
}

impl ConversionStats {
    pub fn new(executor: Arc<dyn QueryExecutor>, tables: TableNames, storage_timezone: Tz) -> Self {
        Self {
            executor,
            builder: ReportQueryBuilder::new(tables, storage_timezone),
            normalizer: TimeBucketNormalizer::new(storage_timezone),
        }
    }

    pub fn from_config(executor: Arc<dyn QueryExecutor>, config: &Config) -> Self {
        Self::new(executor, config.tables.clone(), config.storage_timezone)
    }

    /// Add approved/pending conversion counts to `accumulator`
    pub async fn compute_conversion_stats(
        &self,
        accumulator: &mut ResultAccumulator,
        granularity: Granularity,
        params: &QueryParameterSet,
        empty_row: &BucketedRow,
    ) -> ReportResult<()> {
        let query = self.builder.build(params, granularity)?;

        let rows = match self.executor.execute(&query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Conversion query failed, leaving report rows untouched: {}", e);
                return Err(e.into());
            }
        };
        let raw_rows = rows.len();

        let normalized = self
            .normalizer
            .normalize(rows, &query.bucket, params.timezone)?;
        let buckets = normalized.len();

        merge(accumulator, normalized, empty_row);

        info!(
            ?granularity,
            raw_rows,
            buckets,
            timezone = %params.timezone,
            "Merged conversion stats"
        );
        Ok(())
    }
}
