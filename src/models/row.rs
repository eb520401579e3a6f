use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Column holding the hour-level bucket timestamp of every result row.
pub const DAY_AND_HOUR: &str = "day_and_hour";

/// Column holding the ad/zone composite key for entity reports.
pub const PKEY: &str = "pkey";

/// A single cell of a statistics row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl StatValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StatValue::Int(v) => Some(*v as f64),
            StatValue::Float(v) => Some(*v),
            StatValue::Text(_) | StatValue::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StatValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            StatValue::Null => true,
            StatValue::Int(v) => *v == 0,
            StatValue::Float(v) => *v == 0.0,
            StatValue::Text(s) => s.is_empty() || s == "0",
        }
    }

    /// Combine two values that landed in the same bucket.
    ///
    /// Numbers add up; for anything else the value already held is kept.
    pub fn accumulate(&mut self, other: &StatValue) {
        match (&mut *self, other) {
            (StatValue::Int(a), StatValue::Int(b)) => *a += *b,
            (StatValue::Float(a), StatValue::Float(b)) => *a += *b,
            (StatValue::Float(a), StatValue::Int(b)) => *a += *b as f64,
            (StatValue::Int(a), StatValue::Float(b)) => {
                *self = StatValue::Float(*a as f64 + *b);
            }
            (StatValue::Null, v) => *self = v.clone(),
            _ => {}
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Null => Ok(()),
            StatValue::Int(v) => write!(f, "{}", v),
            StatValue::Float(v) => write!(f, "{}", v),
            StatValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Int(v)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

/// One row of statistics, keyed by column name
pub type BucketedRow = BTreeMap<String, StatValue>;

/// Caller-owned rows keyed by final bucket key
pub type ResultAccumulator = BTreeMap<String, BucketedRow>;
