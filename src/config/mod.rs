use anyhow::Context;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::query::TableRole;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub tables: TableNames,
    /// Timezone the event log timestamps are written in
    pub storage_timezone: Tz,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

/// Physical table names, each combined with a shared prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    pub prefix: String,
    pub data_intermediate_ad_connection: String,
    pub banners: String,
    pub campaigns: String,
    pub clients: String,
    pub zones: String,
    pub affiliates: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self::with_prefix("")
    }
}

impl TableNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            data_intermediate_ad_connection: "data_intermediate_ad_connection".to_string(),
            banners: "banners".to_string(),
            campaigns: "campaigns".to_string(),
            clients: "clients".to_string(),
            zones: "zones".to_string(),
            affiliates: "affiliates".to_string(),
        }
    }

    /// Prefixed name of the table playing `role`
    pub fn name(&self, role: TableRole) -> String {
        let base = match role {
            TableRole::Connection => &self.data_intermediate_ad_connection,
            TableRole::Banner => &self.banners,
            TableRole::Campaign => &self.campaigns,
            TableRole::Client => &self.clients,
            TableRole::Zone => &self.zones,
            TableRole::Affiliate => &self.affiliates,
        };
        format!("{}{}", self.prefix, base)
    }
}

impl DatabaseConfig {
    const fn default_max_connections() -> u32 {
        5
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./delivery_stats.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?
            .unwrap_or_else(DatabaseConfig::default_max_connections);

        let prefix = std::env::var("TABLE_PREFIX").unwrap_or_default();

        let storage_timezone = match std::env::var("STORAGE_TIMEZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .ok()
                .with_context(|| format!("STORAGE_TIMEZONE '{name}' is not a known timezone"))?,
            Err(_) => Tz::UTC,
        };

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            tables: TableNames::with_prefix(&prefix),
            storage_timezone,
        })
    }
}
