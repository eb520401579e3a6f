//! SQL rendering of [`ReportQuery`]
//!
//! All caller-supplied values leave here as bind parameters; only constants
//! chosen by the builder are written into the query text.

use crate::query::ir::{BindValue, Condition, Expr, JoinKind, ReportQuery, TableRole};

/// SQL text with its bind parameters in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub binds: Vec<BindValue>,
}

/// Dialect hooks for turning a [`ReportQuery`] into SQL
pub trait QueryRenderer: Send + Sync {
    /// Placeholder for the bind parameter at 1-based `index`
    fn placeholder(&self, index: usize) -> String;

    /// Format a timestamp expression as `YYYY-MM-DD HH:00:00`
    fn hour_bucket(&self, expr: &str) -> String;

    fn concat(&self, parts: &[String]) -> String;

    /// Wrap a placeholder that carries a timestamp
    fn timestamp_param(&self, placeholder: String) -> String {
        placeholder
    }

    fn render(&self, query: &ReportQuery) -> RenderedQuery {
        render_query(self, query)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl QueryRenderer for SqliteDialect {
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn hour_bucket(&self, expr: &str) -> String {
        format!("strftime('%Y-%m-%d %H:00:00', {expr})")
    }

    fn concat(&self, parts: &[String]) -> String {
        format!("({})", parts.join(" || "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl QueryRenderer for PostgresDialect {
    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn hour_bucket(&self, expr: &str) -> String {
        format!("to_char({expr}, 'YYYY-MM-DD HH24:00:00')")
    }

    fn concat(&self, parts: &[String]) -> String {
        format!("CONCAT({})", parts.join(", "))
    }

    fn timestamp_param(&self, placeholder: String) -> String {
        format!("CAST({placeholder} AS TIMESTAMP)")
    }
}

pub fn render_query<R: QueryRenderer + ?Sized>(dialect: &R, query: &ReportQuery) -> RenderedQuery {
    let mut writer = Writer {
        dialect,
        binds: Vec::new(),
    };

    let fields: Vec<String> = query
        .select
        .iter()
        .map(|item| format!("{} AS {}", writer.expr(&item.expr), item.alias))
        .collect();

    let mut sql = format!(
        "SELECT {}\nFROM {} {}",
        fields.join(", "),
        query.table,
        TableRole::Connection.alias()
    );

    for join in &query.joins {
        let keyword = match join.kind {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        let on = writer.conditions(&join.on);
        sql.push_str(&format!(
            "\n{keyword} {} {} ON ({on})",
            join.table,
            join.role.alias()
        ));
    }

    if !query.filters.is_empty() {
        let filters = writer.conditions(&query.filters);
        sql.push_str(&format!("\nWHERE {filters}"));
    }

    if !query.group_by.is_empty() {
        let groups: Vec<String> = query
            .group_by
            .iter()
            .map(|alias| match query.select_item(alias) {
                Some(item) => writer.expr(&item.expr),
                None => alias.clone(),
            })
            .collect();
        sql.push_str(&format!("\nGROUP BY {}", groups.join(", ")));
    }

    RenderedQuery {
        sql,
        binds: writer.binds,
    }
}

struct Writer<'a, R: QueryRenderer + ?Sized> {
    dialect: &'a R,
    binds: Vec<BindValue>,
}

impl<R: QueryRenderer + ?Sized> Writer<'_, R> {
    fn expr(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Column { table, name } => format!("{}.{}", table.alias(), name),
            Expr::Int(v) => v.to_string(),
            Expr::Text(s) => format!("'{}'", s.replace('\'', "''")),
            Expr::Concat(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| self.expr(p)).collect();
                self.dialect.concat(&parts)
            }
            Expr::HourBucket(inner) => {
                let inner = self.expr(inner);
                self.dialect.hour_bucket(&inner)
            }
            Expr::CountWhere(conditions) => {
                let conditions = self.conditions(conditions);
                format!("SUM(CASE WHEN {conditions} THEN 1 ELSE 0 END)")
            }
        }
    }

    fn conditions(&mut self, conditions: &[Condition]) -> String {
        conditions
            .iter()
            .map(|c| self.condition(c))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Eq(left, right) => {
                format!("{} = {}", self.expr(left), self.expr(right))
            }
            Condition::EqParam(left, value) => {
                let left = self.expr(left);
                format!("{left} = {}", self.bind(value.clone()))
            }
            Condition::Between(expr, low, high) => {
                let expr = self.expr(expr);
                let low = self.bind(low.clone());
                let high = self.bind(high.clone());
                format!("{expr} BETWEEN {low} AND {high}")
            }
        }
    }

    fn bind(&mut self, value: BindValue) -> String {
        let is_timestamp = matches!(value, BindValue::Timestamp(_));
        self.binds.push(value);
        let placeholder = self.dialect.placeholder(self.binds.len());
        if is_timestamp {
            self.dialect.timestamp_param(placeholder)
        } else {
            placeholder
        }
    }
}
