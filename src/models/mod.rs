pub mod granularity;
pub mod params;
pub mod row;

pub use granularity::{BucketMethod, Granularity};
pub use params::{Dimension, QueryParameterSet, ReportRequest};
pub use row::{BucketedRow, ResultAccumulator, StatValue, DAY_AND_HOUR, PKEY};
