use crate::models::{BucketedRow, Dimension, ResultAccumulator, StatValue, DAY_AND_HOUR, PKEY};
use crate::report::normalize::NormalizedRows;

const DIMENSIONS: [Dimension; 5] = [
    Dimension::Advertiser,
    Dimension::Placement,
    Dimension::Publisher,
    Dimension::Ad,
    Dimension::Zone,
];

/// Entity id columns. A bucket only carries one when every row agrees on it.
fn is_dimension_column(column: &str) -> bool {
    DIMENSIONS.iter().any(|d| d.column() == column)
}

/// Fold rows that share a bucket key into one.
///
/// Measures are summed. `day_and_hour`, `pkey` and text columns keep the
/// first value seen. A dimension column whose rows disagree becomes
/// [`StatValue::Null`], so no single entity is credited with the others'
/// counts.
pub fn combine(rows: Vec<BucketedRow>) -> BucketedRow {
    let mut rows = rows.into_iter();
    let mut combined = rows.next().unwrap_or_default();
    for row in rows {
        for (column, value) in row {
            match combined.get_mut(&column) {
                Some(existing) if is_dimension_column(&column) => {
                    if *existing != value {
                        *existing = StatValue::Null;
                    }
                }
                Some(_) if column == DAY_AND_HOUR || column == PKEY => {}
                Some(existing) => existing.accumulate(&value),
                None => {
                    combined.insert(column, value);
                }
            }
        }
    }
    combined
}

/// Merge one statistics source into the accumulator.
///
/// Only keys present in `normalized` are touched. A key seen for the first
/// time starts from `empty_row`; each column the source provides then
/// replaces what the accumulator held, leaving other sources' columns alone.
pub fn merge(
    accumulator: &mut ResultAccumulator,
    normalized: NormalizedRows,
    empty_row: &BucketedRow,
) {
    for (key, rows) in normalized {
        let target = accumulator.entry(key).or_insert_with(|| empty_row.clone());
        for (column, value) in combine(rows) {
            target.insert(column, value);
        }
    }
}

/// Zero-valued template row over `columns`
pub fn empty_row<'a>(columns: impl IntoIterator<Item = &'a str>) -> BucketedRow {
    columns
        .into_iter()
        .map(|c| (c.to_string(), StatValue::Int(0)))
        .collect()
}
