use chrono::{Datelike, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use std::collections::BTreeMap;

use crate::error::{ReportError, ReportResult};
use crate::models::{BucketMethod, BucketedRow, StatValue, DAY_AND_HOUR, PKEY};
use crate::timezone::{self, TIMESTAMP_FORMAT};

/// Rows grouped by their final bucket key, in arrival order within a key
pub type NormalizedRows = BTreeMap<String, Vec<BucketedRow>>;

/// Re-keys hourly result rows into the reporting timezone
#[derive(Debug, Clone, Copy)]
pub struct TimeBucketNormalizer {
    storage_timezone: Tz,
}

impl TimeBucketNormalizer {
    pub fn new(storage_timezone: Tz) -> Self {
        Self { storage_timezone }
    }

    /// Assign every row its final bucket key.
    ///
    /// Rows never get combined here; two rows landing on the same key are
    /// both kept under it.
    pub fn normalize(
        &self,
        rows: Vec<BucketedRow>,
        method: &BucketMethod,
        target: Tz,
    ) -> ReportResult<NormalizedRows> {
        let mut normalized = NormalizedRows::new();
        for mut row in rows {
            let key = match method {
                BucketMethod::EntityKey => entity_key(&row)?,
                _ => {
                    let local = timezone::convert(hour_of(&row)?, self.storage_timezone, target);
                    row.insert(
                        DAY_AND_HOUR.to_string(),
                        StatValue::Text(local.format(TIMESTAMP_FORMAT).to_string()),
                    );
                    bucket_key(local, method)
                }
            };
            normalized.entry(key).or_default().push(row);
        }
        Ok(normalized)
    }
}

fn bucket_key(local: NaiveDateTime, method: &BucketMethod) -> String {
    match method {
        BucketMethod::Format(pattern) => local.format(pattern).to_string(),
        BucketMethod::DayOfWeek => local.weekday().num_days_from_sunday().to_string(),
        BucketMethod::Hour => local.hour().to_string(),
        BucketMethod::EntityKey => local.format(TIMESTAMP_FORMAT).to_string(),
    }
}

fn hour_of(row: &BucketedRow) -> ReportResult<NaiveDateTime> {
    let raw = row
        .get(DAY_AND_HOUR)
        .and_then(StatValue::as_str)
        .ok_or_else(|| ReportError::MalformedRow(format!("missing {DAY_AND_HOUR}")))?;
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| ReportError::MalformedRow(format!("{DAY_AND_HOUR} '{raw}': {e}")))
}

fn entity_key(row: &BucketedRow) -> ReportResult<String> {
    match row.get(PKEY) {
        Some(StatValue::Null) | None => {
            Err(ReportError::MalformedRow(format!("missing {PKEY}")))
        }
        Some(value) => Ok(value.to_string()),
    }
}
