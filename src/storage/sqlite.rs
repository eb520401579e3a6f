use crate::config::TableNames;
use crate::models::{BucketedRow, StatValue};
use crate::query::{BindValue, QueryRenderer, ReportQuery, SqliteDialect, TableRole};
use crate::storage::{ExecutionError, ExecutionResult, QueryExecutor};
use crate::timezone::TIMESTAMP_FORMAT;
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool};
use std::sync::Arc;
use tracing::debug;

pub struct SqliteExecutor {
    pool: Arc<SqlitePool>,
    tables: TableNames,
}

impl SqliteExecutor {
    pub async fn new(database_url: &str, max_connections: u32, tables: TableNames) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
            tables,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        self.pool.as_ref()
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn init(&self) -> Result<()> {
        let connections = self.tables.name(TableRole::Connection);

        // Ad/tracker connection event log
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {connections} (
                data_intermediate_ad_connection_id INTEGER PRIMARY KEY AUTOINCREMENT,
                tracker_date_time TEXT NOT NULL,
                ad_id INTEGER NOT NULL DEFAULT 0,
                zone_id INTEGER NOT NULL DEFAULT 0,
                connection_action INTEGER NOT NULL DEFAULT 0,
                connection_status INTEGER NOT NULL DEFAULT 4,
                inside_window INTEGER NOT NULL DEFAULT 1
            )
            "#
        ))
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{connections}_tracker_date_time ON {connections}(tracker_date_time)"
        ))
        .execute(self.pool.as_ref())
        .await?;

        let entities = [
            (TableRole::Banner, "bannerid", "campaignid"),
            (TableRole::Campaign, "campaignid", "clientid"),
            (TableRole::Client, "clientid", "agencyid"),
            (TableRole::Zone, "zoneid", "affiliateid"),
            (TableRole::Affiliate, "affiliateid", "agencyid"),
        ];
        for (role, id, parent) in entities {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    {id} INTEGER PRIMARY KEY,
                    {parent} INTEGER NOT NULL DEFAULT 0
                )
                "#,
                table = self.tables.name(role),
            ))
            .execute(self.pool.as_ref())
            .await?;
        }

        Ok(())
    }

    async fn execute(&self, query: &ReportQuery) -> ExecutionResult<Vec<BucketedRow>> {
        let rendered = SqliteDialect.render(query);
        debug!(sql = %rendered.sql, binds = rendered.binds.len(), "Executing report query");

        let mut statement = sqlx::query(&rendered.sql);
        for bind in &rendered.binds {
            statement = match bind {
                BindValue::Int(v) => statement.bind(*v),
                BindValue::Text(s) => statement.bind(s.clone()),
                BindValue::Timestamp(ts) => statement.bind(ts.format(TIMESTAMP_FORMAT).to_string()),
            };
        }

        let rows = statement.fetch_all(self.pool.as_ref()).await?;
        debug!(rows = rows.len(), "Report query returned");

        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &SqliteRow) -> ExecutionResult<BucketedRow> {
    let mut decoded = BucketedRow::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            v.map_or(StatValue::Null, StatValue::Int)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            v.map_or(StatValue::Null, StatValue::Float)
        } else if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            v.map_or(StatValue::Null, StatValue::Text)
        } else {
            return Err(ExecutionError::Decode {
                column: column.name().to_string(),
                reason: "unsupported sqlite type".to_string(),
            });
        };
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}
