use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use delivery_stats::catalog::{format_stats, DeliveryFields, NumberFormat, StatisticsFieldProvider};
use delivery_stats::config::{Config, DatabaseBackend};
use delivery_stats::models::{Granularity, QueryParameterSet, ReportRequest, ResultAccumulator};
use delivery_stats::report::ConversionStats;
use delivery_stats::storage::{PostgresExecutor, QueryExecutor, SqliteExecutor};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "delivery-stats")]
#[command(about = "Conversion statistics for delivery reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the event log and entity tables
    Init,
    /// Print conversion statistics as JSON
    Conversions {
        /// Bucketing: day, month, dow, hour or entity
        #[arg(short, long, default_value = "day")]
        granularity: Granularity,
        /// First day of the report (YYYY-MM-DD)
        #[arg(long)]
        day_begin: Option<String>,
        /// Last day of the report (YYYY-MM-DD)
        #[arg(long)]
        day_end: Option<String>,
        #[arg(long)]
        agency: Option<String>,
        #[arg(long)]
        advertiser: Option<String>,
        #[arg(long)]
        placement: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        ad: Option<String>,
        /// Zone filter; 0 selects direct deliveries
        #[arg(long)]
        zone: Option<String>,
        /// Dimensions to add as columns (advertiser_id, placement_id, publisher_id)
        #[arg(long, value_delimiter = ',')]
        include: Vec<String>,
        /// Dimensions to leave out
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Reporting timezone (IANA name)
        #[arg(long)]
        timezone: Option<String>,
        /// Print display-formatted values instead of raw numbers
        #[arg(long)]
        formatted: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!("Loaded configuration");

    let executor: Arc<dyn QueryExecutor> = match config.database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.database.url);
            Arc::new(
                SqliteExecutor::new(
                    &config.database.url,
                    config.database.max_connections,
                    config.tables.clone(),
                )
                .await?,
            )
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", config.database.url);
            Arc::new(
                PostgresExecutor::new(
                    &config.database.url,
                    config.database.max_connections,
                    config.tables.clone(),
                )
                .await?,
            )
        }
    };

    match cli.command {
        Commands::Init => {
            executor.init().await?;
            println!("✓ Report tables initialized");
        }
        Commands::Conversions {
            granularity,
            day_begin,
            day_end,
            agency,
            advertiser,
            placement,
            publisher,
            ad,
            zone,
            include,
            exclude,
            timezone,
            formatted,
        } => {
            let request = ReportRequest {
                day_begin,
                day_end,
                agency_id: agency,
                advertiser_id: advertiser,
                placement_id: placement,
                publisher_id: publisher,
                ad_id: ad,
                zone_id: zone,
                include,
                exclude,
                timezone,
            };
            let params = QueryParameterSet::try_from(request)?;

            let fields = DeliveryFields::new();
            let stats = ConversionStats::from_config(executor, &config);
            let mut rows = ResultAccumulator::new();
            stats
                .compute_conversion_stats(
                    &mut rows,
                    granularity,
                    &params,
                    &fields.catalog().empty_row(),
                )
                .await
                .context("Failed to compute conversion stats")?;

            for row in rows.values_mut() {
                fields.summarize_stats(row);
            }

            let output = if formatted {
                let numbers = NumberFormat::default();
                let display: Vec<_> = rows
                    .iter()
                    .map(|(key, row)| (key, format_stats(fields.catalog(), row, false, &numbers)))
                    .collect();
                serde_json::to_string_pretty(&display)?
            } else {
                serde_json::to_string_pretty(&rows)?
            };
            println!("{}", output);
        }
    }

    Ok(())
}
