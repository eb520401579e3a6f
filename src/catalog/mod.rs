//! Column catalog of a statistics field provider
//!
//! Describes the columns a provider contributes to a report and answers the
//! lookups a report screen needs: labels, links, visibility, formats and the
//! zero row used to fill buckets.

pub mod format;
pub mod provider;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{BucketedRow, StatValue};

pub use format::{format_stats, NumberFormat};
pub use provider::{DeliveryFields, StatisticsFieldProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Id,
    Default,
    Percent,
    Currency,
}

/// Kind of report screen a column can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Per advertiser/campaign/banner/publisher/zone listings
    EntityReport,
    /// Per day/month/weekday/hour listings
    HistoryReport,
}

/// Account types a column can be shown to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Admin,
    Advertiser,
    Publisher,
    Agency,
}

impl UserType {
    pub fn bit(self) -> u32 {
        match self {
            UserType::Admin => 1,
            UserType::Advertiser => 2,
            UserType::Publisher => 4,
            UserType::Agency => 8,
        }
    }
}

/// Metadata of one displayable column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub short: Option<String>,
    pub pref: Option<String>,
    pub required_capability: Option<Capability>,
    pub format: FormatKind,
    pub link: Option<String>,
    pub rank: Option<u32>,
    /// A positive value in this column marks the row as active
    pub active: bool,
}

impl FieldSpec {
    pub fn new(name: &str, format: FormatKind) -> Self {
        Self {
            name: name.to_string(),
            short: None,
            pref: None,
            required_capability: None,
            format,
            link: None,
            rank: None,
            active: false,
        }
    }

    pub fn short(mut self, short: &str) -> Self {
        self.short = Some(short.to_string());
        self
    }

    pub fn pref(mut self, pref: &str, rank: u32) -> Self {
        self.pref = Some(pref.to_string());
        self.rank = Some(rank);
        self
    }

    pub fn requires(mut self, capability: Capability) -> Self {
        self.required_capability = Some(capability);
        self
    }

    pub fn link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn active(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn is_summable(&self) -> bool {
        self.format != FormatKind::Percent
    }
}

/// Who is looking at the report, and on which screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub capabilities: BTreeSet<Capability>,
    pub user: UserType,
}

impl ReportContext {
    pub fn new(user: UserType, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
            user,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    /// Fall back to the column's default rank
    Default,
    /// Bitmask of [`UserType::bit`] values allowed to see the column
    Users(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnPreference {
    pub label: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Explicit per-account display preferences, keyed by preference name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnPreference>,
}

impl Preferences {
    pub fn column(&self, pref: &str) -> Option<&ColumnPreference> {
        self.columns.get(pref)
    }
}

/// Ordered set of a provider's columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnCatalog {
    fields: Vec<FieldSpec>,
}

impl ColumnCatalog {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Column labels available to `context`, preferring a preference label
    pub fn fields(&self, context: &ReportContext, prefs: &Preferences) -> IndexMap<String, String> {
        self.fields
            .iter()
            .filter(|f| {
                f.required_capability
                    .map_or(true, |c| context.capabilities.contains(&c))
            })
            .map(|f| {
                let custom = f
                    .pref
                    .as_deref()
                    .and_then(|p| prefs.column(p))
                    .and_then(|p| p.label.clone())
                    .filter(|l| !l.is_empty());
                let label = custom
                    .or_else(|| f.short.clone())
                    .unwrap_or_else(|| f.name.clone());
                (f.name.clone(), label)
            })
            .collect()
    }

    pub fn column_links(&self) -> IndexMap<String, String> {
        self.fields
            .iter()
            .filter_map(|f| {
                f.link
                    .as_ref()
                    .filter(|l| !l.is_empty())
                    .map(|l| (f.name.clone(), l.clone()))
            })
            .collect()
    }

    pub fn visible_columns(&self, prefs: &Preferences, user: UserType) -> IndexMap<String, bool> {
        self.fields
            .iter()
            .map(|f| {
                let visibility = f
                    .pref
                    .as_deref()
                    .and_then(|p| prefs.column(p))
                    .and_then(|p| p.visibility);
                let visible = match visibility {
                    Some(Visibility::Default) => f.rank.is_some_and(|r| r > 0),
                    Some(Visibility::Users(mask)) => mask & user.bit() != 0,
                    None => false,
                };
                (f.name.clone(), visible)
            })
            .collect()
    }

    /// Every column set to zero
    pub fn empty_row(&self) -> BucketedRow {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), StatValue::Int(0)))
            .collect()
    }

    /// Columns whose values can be added up across rows
    pub fn sum_field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.is_summable())
            .map(|f| f.name.clone())
            .collect()
    }

    pub fn preference_names(&self) -> IndexMap<String, String> {
        self.fields
            .iter()
            .filter_map(|f| f.pref.as_ref().map(|p| (f.name.clone(), p.clone())))
            .collect()
    }

    pub fn default_ranks(&self) -> IndexMap<String, u32> {
        self.fields
            .iter()
            .filter_map(|f| match (&f.pref, f.rank) {
                (Some(p), Some(rank)) => Some((p.clone(), rank)),
                _ => None,
            })
            .collect()
    }

    /// Preference name to full column name, for settings screens
    pub fn visibility_settings(&self) -> IndexMap<String, String> {
        self.fields
            .iter()
            .filter_map(|f| f.pref.as_ref().map(|p| (p.clone(), f.name.clone())))
            .collect()
    }

    pub fn is_row_active(&self, row: &BucketedRow) -> bool {
        self.fields.iter().filter(|f| f.active).any(|f| {
            row.get(&f.name)
                .and_then(StatValue::as_f64)
                .is_some_and(|v| v > 0.0)
        })
    }

    pub fn formats(&self) -> IndexMap<String, FormatKind> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.format))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ColumnCatalog {
        ColumnCatalog::new(vec![
            FieldSpec::new("id", FormatKind::Id)
                .short("ID")
                .pref("ui_column_id", 0)
                .requires(Capability::EntityReport),
            FieldSpec::new("Impressions", FormatKind::Default)
                .short("Impr.")
                .pref("ui_column_impressions", 1)
                .active(),
            FieldSpec::new("CTR", FormatKind::Percent).pref("ui_column_ctr", 2),
            FieldSpec::new("Pending", FormatKind::Default)
                .link("stats.php?entity=conversions&"),
        ])
    }

    fn names(catalog: &ColumnCatalog) -> Vec<&str> {
        catalog.field_names().collect()
    }

    #[test]
    fn test_fields_filtered_by_capability() {
        let history = ReportContext::new(UserType::Admin, [Capability::HistoryReport]);
        let labels = catalog().fields(&history, &Preferences::default());
        let keys: Vec<_> = labels.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Impressions", "CTR", "Pending"]);
        assert_eq!(labels["Impressions"], "Impr.");
        assert_eq!(labels["CTR"], "CTR");

        let entity = ReportContext::new(UserType::Admin, [Capability::EntityReport]);
        assert!(catalog().fields(&entity, &Preferences::default()).contains_key("id"));
    }

    #[test]
    fn test_preference_label_overrides() {
        let mut prefs = Preferences::default();
        prefs.columns.insert(
            "ui_column_impressions".to_string(),
            ColumnPreference {
                label: Some("Views".to_string()),
                visibility: None,
            },
        );
        prefs.columns.insert(
            "ui_column_ctr".to_string(),
            ColumnPreference {
                label: Some(String::new()),
                visibility: None,
            },
        );
        let context = ReportContext::new(UserType::Admin, [Capability::HistoryReport]);
        let labels = catalog().fields(&context, &prefs);
        assert_eq!(labels["Impressions"], "Views");
        assert_eq!(labels["CTR"], "CTR", "empty label falls back");
    }

    #[test]
    fn test_visible_columns() {
        let mut prefs = Preferences::default();
        prefs.columns.insert(
            "ui_column_impressions".to_string(),
            ColumnPreference {
                label: None,
                visibility: Some(Visibility::Default),
            },
        );
        prefs.columns.insert(
            "ui_column_ctr".to_string(),
            ColumnPreference {
                label: None,
                visibility: Some(Visibility::Users(
                    UserType::Admin.bit() | UserType::Agency.bit(),
                )),
            },
        );
        prefs.columns.insert(
            "ui_column_id".to_string(),
            ColumnPreference {
                label: None,
                visibility: Some(Visibility::Default),
            },
        );

        let admin = catalog().visible_columns(&prefs, UserType::Admin);
        assert!(admin["Impressions"]);
        assert!(admin["CTR"]);
        assert!(!admin["id"], "rank 0 hides by default");
        assert!(!admin["Pending"], "no preference means hidden");

        let advertiser = catalog().visible_columns(&prefs, UserType::Advertiser);
        assert!(!advertiser["CTR"]);
    }

    #[test]
    fn test_row_helpers() {
        let catalog = catalog();
        assert_eq!(names(&catalog), vec!["id", "Impressions", "CTR", "Pending"]);

        let empty = catalog.empty_row();
        assert_eq!(empty.len(), 4);
        assert!(empty.values().all(|v| *v == StatValue::Int(0)));
        assert!(!catalog.is_row_active(&empty));

        let mut row = empty.clone();
        row.insert("CTR".to_string(), StatValue::Float(0.5));
        assert!(!catalog.is_row_active(&row), "CTR is not an activity column");
        row.insert("Impressions".to_string(), StatValue::Int(1));
        assert!(catalog.is_row_active(&row));

        assert_eq!(catalog.sum_field_names(), vec!["id", "Impressions", "Pending"]);
        assert_eq!(
            catalog.column_links().get("Pending").map(String::as_str),
            Some("stats.php?entity=conversions&")
        );
        assert_eq!(catalog.formats()["CTR"], FormatKind::Percent);
        assert_eq!(catalog.preference_names().len(), 3);
        assert_eq!(catalog.default_ranks()["ui_column_ctr"], 2);
        assert_eq!(catalog.visibility_settings()["ui_column_id"], "id");
    }
}
