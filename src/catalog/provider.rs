use crate::catalog::{Capability, ColumnCatalog, FieldSpec, FormatKind};
use crate::models::{BucketedRow, StatValue};
use crate::query::builder::{SUM_CONVERSIONS, SUM_CONVERSIONS_PENDING};

/// A source of report columns
pub trait StatisticsFieldProvider: Send + Sync {
    fn name(&self) -> &str;

    fn catalog(&self) -> &ColumnCatalog;

    /// Fill in the columns derived from other columns of `row`
    fn summarize_stats(&self, row: &mut BucketedRow);
}

pub const SUM_VIEWS: &str = "sum_views";
pub const SUM_CLICKS: &str = "sum_clicks";
pub const SUM_CTR: &str = "sum_ctr";
pub const SUM_SR_VIEWS: &str = "sum_sr_views";
pub const SUM_SR_CLICKS: &str = "sum_sr_clicks";
pub const SUM_REVENUE: &str = "sum_revenue";

/// Standard delivery columns: traffic, conversions and the ratios between them
pub struct DeliveryFields {
    catalog: ColumnCatalog,
}

impl Default for DeliveryFields {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryFields {
    pub fn new() -> Self {
        let catalog = ColumnCatalog::new(vec![
            FieldSpec::new("id", FormatKind::Id)
                .short("ID")
                .pref("ui_column_id", 1)
                .requires(Capability::EntityReport),
            FieldSpec::new(SUM_VIEWS, FormatKind::Default)
                .short("Impr.")
                .pref("ui_column_impressions", 2)
                .active(),
            FieldSpec::new(SUM_CLICKS, FormatKind::Default)
                .short("Clicks")
                .pref("ui_column_clicks", 3)
                .active(),
            FieldSpec::new(SUM_CTR, FormatKind::Percent)
                .short("CTR")
                .pref("ui_column_ctr", 4),
            FieldSpec::new(SUM_CONVERSIONS, FormatKind::Default)
                .short("Conv.")
                .pref("ui_column_conversions", 5)
                .active(),
            FieldSpec::new(SUM_CONVERSIONS_PENDING, FormatKind::Default)
                .short("Pending conv.")
                .pref("ui_column_conversions_pending", 6)
                .link("stats.php?entity=conversions&"),
            FieldSpec::new(SUM_SR_VIEWS, FormatKind::Percent)
                .short("SR (Impr.)")
                .pref("ui_column_sr_views", 7),
            FieldSpec::new(SUM_SR_CLICKS, FormatKind::Percent)
                .short("SR (Clicks)")
                .pref("ui_column_sr_clicks", 8),
            FieldSpec::new(SUM_REVENUE, FormatKind::Currency)
                .short("Revenue")
                .pref("ui_column_revenue", 9),
        ]);
        Self { catalog }
    }
}

impl StatisticsFieldProvider for DeliveryFields {
    fn name(&self) -> &str {
        "Default delivery statistics"
    }

    fn catalog(&self) -> &ColumnCatalog {
        &self.catalog
    }

    fn summarize_stats(&self, row: &mut BucketedRow) {
        let value = |row: &BucketedRow, column: &str| {
            row.get(column).and_then(StatValue::as_f64).unwrap_or(0.0)
        };
        let views = value(row, SUM_VIEWS);
        let clicks = value(row, SUM_CLICKS);
        let conversions = value(row, SUM_CONVERSIONS);

        row.insert(SUM_CTR.to_string(), StatValue::Float(ratio(clicks, views)));
        row.insert(SUM_SR_VIEWS.to_string(), StatValue::Float(ratio(conversions, views)));
        row.insert(SUM_SR_CLICKS.to_string(), StatValue::Float(ratio(conversions, clicks)));
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_derives_ratios() {
        let fields = DeliveryFields::new();
        let mut row = fields.catalog().empty_row();
        row.insert(SUM_VIEWS.to_string(), StatValue::Int(200));
        row.insert(SUM_CLICKS.to_string(), StatValue::Int(10));
        row.insert(SUM_CONVERSIONS.to_string(), StatValue::Int(2));

        fields.summarize_stats(&mut row);

        assert_eq!(row[SUM_CTR], StatValue::Float(0.05));
        assert_eq!(row[SUM_SR_VIEWS], StatValue::Float(0.01));
        assert_eq!(row[SUM_SR_CLICKS], StatValue::Float(0.2));
    }

    #[test]
    fn test_summarize_without_traffic() {
        let fields = DeliveryFields::new();
        let mut row = fields.catalog().empty_row();
        row.insert(SUM_CONVERSIONS.to_string(), StatValue::Int(3));
        fields.summarize_stats(&mut row);
        assert_eq!(row[SUM_CTR], StatValue::Float(0.0));
        assert_eq!(row[SUM_SR_CLICKS], StatValue::Float(0.0));
    }

    #[test]
    fn test_ratios_are_not_summed() {
        let fields = DeliveryFields::new();
        let sums = fields.catalog().sum_field_names();
        assert!(sums.contains(&SUM_VIEWS.to_string()));
        assert!(!sums.contains(&SUM_CTR.to_string()));
        assert!(!sums.contains(&SUM_SR_CLICKS.to_string()));
        assert_eq!(fields.name(), "Default delivery statistics");
    }
}
