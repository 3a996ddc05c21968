//! Nutrition Loader CLI
//!
//! Imports the food-nutrition spreadsheet (or a CSV export) into the record store
//! and mirrors it into the search index, or rebuilds the index from the store.

use clap::Parser;
use nutrition_core::prelude::*;
use nutrition_search::EsSearchIndex;
use nutrition_store::SqlRecordStore;
use nutrition_sync::{Loader, SyncOrchestrator};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "nutrition-loader")]
#[command(about = "Bulk loader for the food nutrition service")]
#[command(version)]
struct Args {
    /// Spreadsheet (.xlsx) or CSV file to import
    #[arg(short, long, env = "DATA_FILE", default_value = "data/food_data.xlsx")]
    file: String,

    /// Rebuild the search index from the store instead of importing
    #[arg(long)]
    reindex: bool,

    /// Records per bulk request when rebuilding
    #[arg(long, default_value_t = 500)]
    batch_size: u64,

    /// Configuration file path
    #[arg(short, long, env = "NUTRITION_CONFIG")]
    config: Option<String>,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Elasticsearch hosts (comma-separated)
    #[arg(long, env = "ELASTICSEARCH_HOSTS")]
    es_hosts: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(url) = args.database_url {
        config.database.url = url;
    }
    if let Some(ref hosts) = args.es_hosts {
        config = config.with_es_hosts(hosts);
    }
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }
    config.validate()?;

    init_tracing(&config.observability.log_level, &config.observability.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting nutrition-loader");

    let store = SqlRecordStore::connect(&config.database).await?;
    store.ensure_schema().await?;

    let index = EsSearchIndex::new(config.elasticsearch.clone())?;
    if index.ping().await {
        if let Err(e) = index.ensure_schema().await {
            warn!(error = %e, "Failed to ensure index schema");
        }
    } else {
        warn!(
            hosts = ?config.elasticsearch.hosts,
            "Search cluster unreachable, data will be written to the store only"
        );
    }

    let orchestrator = SyncOrchestrator::new(Arc::new(store.clone()), Arc::new(index));

    if args.reindex {
        let report = orchestrator.rebuild_index(args.batch_size).await?;
        info!(indexed = report.indexed, failed = report.failed, "Reindex complete");
    } else {
        match Loader::new(&orchestrator).load_path(&args.file).await {
            Ok(report) => info!(
                created = report.created,
                existing = report.existing,
                failed = report.failed,
                indexed = report.indexed,
                index_failed = report.index_failed,
                "Import complete"
            ),
            Err(e) => {
                error!(error = %e, file = %args.file, "Import failed");
                store.close().await;
                return Err(e.into());
            }
        }
    }

    store.close().await;
    Ok(())
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);
    if format == "pretty" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }
}
