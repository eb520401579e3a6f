//! Structured form of a report query
//!
//! The builder only ever produces these types; turning them into SQL text is
//! the job of a [`QueryRenderer`](super::sql::QueryRenderer).

use chrono::NaiveDateTime;

use crate::models::BucketMethod;

/// Role a table plays in a report query. Joins are deduplicated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    /// The ad/tracker connection event log
    Connection,
    Banner,
    Campaign,
    Client,
    Zone,
    Affiliate,
}

impl TableRole {
    pub fn alias(self) -> &'static str {
        match self {
            TableRole::Connection => "diac",
            TableRole::Banner => "b",
            TableRole::Campaign => "m",
            TableRole::Client => "c",
            TableRole::Zone => "z",
            TableRole::Affiliate => "p",
        }
    }
}

/// Value sent to the store as a bound parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Int(i64),
    Text(String),
    Timestamp(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column { table: TableRole, name: &'static str },
    /// Integer constant written into the query text
    Int(i64),
    /// String constant written into the query text
    Text(&'static str),
    Concat(Vec<Expr>),
    /// Timestamp truncated and formatted as `YYYY-MM-DD HH:00:00`
    HourBucket(Box<Expr>),
    /// Number of rows matching every condition, 0 when none do
    CountWhere(Vec<Condition>),
}

impl Expr {
    pub fn column(table: TableRole, name: &'static str) -> Self {
        Expr::Column { table, name }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Expr, Expr),
    EqParam(Expr, BindValue),
    Between(Expr, BindValue, BindValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub role: TableRole,
    pub kind: JoinKind,
    pub table: String,
    pub on: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub table: String,
    pub joins: Vec<Join>,
    pub select: Vec<SelectItem>,
    pub filters: Vec<Condition>,
    /// Aliases of select items to group by
    pub group_by: Vec<String>,
    /// How result rows are bucketed after execution
    pub bucket: BucketMethod,
}

impl ReportQuery {
    pub fn new(table: impl Into<String>, bucket: BucketMethod) -> Self {
        Self {
            table: table.into(),
            joins: Vec::new(),
            select: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            bucket,
        }
    }

    pub fn select(&mut self, expr: Expr, alias: &str) {
        self.select.push(SelectItem {
            expr,
            alias: alias.to_string(),
        });
    }

    pub fn filter(&mut self, condition: Condition) {
        self.filters.push(condition);
    }

    pub fn group_by(&mut self, alias: &str) {
        self.group_by.push(alias.to_string());
    }

    /// Add a join unless one for the same role exists already.
    ///
    /// Returns whether the join was added.
    pub fn join(&mut self, join: Join) -> bool {
        if self.has_join(join.role) {
            return false;
        }
        self.joins.push(join);
        true
    }

    pub fn has_join(&self, role: TableRole) -> bool {
        self.joins.iter().any(|j| j.role == role)
    }

    pub fn select_item(&self, alias: &str) -> Option<&SelectItem> {
        self.select.iter().find(|s| s.alias == alias)
    }

    pub fn column_aliases(&self) -> Vec<&str> {
        self.select.iter().map(|s| s.alias.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_join(kind: JoinKind) -> Join {
        Join {
            role: TableRole::Zone,
            kind,
            table: "zones".to_string(),
            on: vec![Condition::Eq(
                Expr::column(TableRole::Zone, "zoneid"),
                Expr::column(TableRole::Connection, "zone_id"),
            )],
        }
    }

    #[test]
    fn test_first_join_for_role_wins() {
        let mut query = ReportQuery::new("conn", BucketMethod::Hour);
        assert!(query.join(zone_join(JoinKind::Left)));
        assert!(!query.join(zone_join(JoinKind::Inner)));
        assert_eq!(query.joins.len(), 1);
        assert_eq!(query.joins[0].kind, JoinKind::Left);
    }
}
