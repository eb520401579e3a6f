use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{ColumnCatalog, FormatKind};
use crate::models::BucketedRow;

/// Number display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub decimal_point: String,
    pub thousands_separator: String,
    pub percentage_decimals: usize,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_point: ".".to_string(),
            thousands_separator: ",".to_string(),
            percentage_decimals: 2,
        }
    }
}

impl NumberFormat {
    pub fn number(&self, value: f64, decimals: usize) -> String {
        let fixed = format!("{:.*}", decimals, value.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let digits: Vec<char> = int_part.chars().collect();
        let mut grouped = String::new();
        for (i, digit) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push_str(&self.thousands_separator);
            }
            grouped.push(*digit);
        }

        let sign = if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
            "-"
        } else {
            ""
        };
        match frac_part {
            Some(frac) => format!("{sign}{grouped}{}{frac}", self.decimal_point),
            None => format!("{sign}{grouped}"),
        }
    }

    /// Ratio as a percentage, 0.1234 -> "12.34%"
    pub fn percentage(&self, ratio: f64) -> String {
        format!("{}%", self.number(ratio * 100.0, self.percentage_decimals))
    }
}

/// Render a row for display.
///
/// Id columns show "-" on total rows; any other zero shows "-". Columns the
/// catalog does not know are passed through as text.
pub fn format_stats(
    catalog: &ColumnCatalog,
    row: &BucketedRow,
    is_total: bool,
    numbers: &NumberFormat,
) -> BTreeMap<String, String> {
    row.iter()
        .map(|(column, value)| {
            let text = match catalog.get(column).map(|f| f.format) {
                None => value.to_string(),
                Some(FormatKind::Id) if is_total => "-".to_string(),
                Some(FormatKind::Id) => value.to_string(),
                Some(_) if value.is_zero() => "-".to_string(),
                Some(kind) => match (kind, value.as_f64()) {
                    (FormatKind::Percent, Some(v)) => numbers.percentage(v),
                    (FormatKind::Currency, Some(v)) => numbers.number(v, 2),
                    (_, Some(v)) => numbers.number(v, 0),
                    (_, None) => value.to_string(),
                },
            };
            (column.clone(), text)
        })
        .collect()
}
