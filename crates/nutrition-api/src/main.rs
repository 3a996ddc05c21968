//! Nutrition API server
//!
//! Serves the food nutrition records over HTTP, mirroring mutations into the
//! search cluster when it is reachable.

use clap::Parser;
use nutrition_api::router;
use nutrition_core::prelude::*;
use nutrition_search::EsSearchIndex;
use nutrition_store::SqlRecordStore;
use nutrition_sync::SyncOrchestrator;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "nutrition-api")]
#[command(about = "HTTP API for food nutrition records")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "NUTRITION_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(long, env = "LISTEN_ADDR")]
    listen: Option<String>,

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
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
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

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.log_format == "pretty" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting nutrition-api");

    let store = SqlRecordStore::connect(&config.database).await?;
    store.ensure_schema().await?;

    let index = EsSearchIndex::new(config.elasticsearch.clone())?;
    if index.ping().await {
        match index.ensure_schema().await {
            Ok(()) => info!(index = index.index_name(), "Search index ready"),
            Err(e) => warn!(error = %e, "Failed to ensure index schema"),
        }
    } else {
        warn!(
            hosts = ?config.elasticsearch.hosts,
            "Search cluster unreachable at startup, mutations will not be mirrored until it returns"
        );
    }

    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::new(store.clone()),
        Arc::new(index),
    ));
    let app = router(orchestrator);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    info!(listen = %config.server.listen, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
