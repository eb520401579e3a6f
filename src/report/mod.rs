pub mod conversions;
pub mod merge;
pub mod normalize;

pub use conversions::ConversionStats;
pub use merge::{combine, empty_row, merge};
pub use normalize::{NormalizedRows, TimeBucketNormalizer};
