//! Stock Ledger Server - Binary Entry Point
//!
//! This is the main entry point for the stock-server binary.

use std::error::Error;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use stock_ledger::api::{serve, AppState};
use stock_ledger::config::{init_tracing, ServerConfig};
use stock_ledger::record_store::{LegacyImporter, StatsCollector, StoreStats};
use stock_ledger::{AccessGate, RecordStore, StaticAccessGate, TokenIssuer};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ServerConfig::from_env()?;
    init_tracing(config.log_format);

    info!(
        name = stock_ledger::NAME,
        version = stock_ledger::VERSION,
        data_dir = %config.data_dir.display(),
        "starting"
    );

    let store = Arc::new(RecordStore::open(config.store_config())?);

    if let Some(csv_path) = &config.legacy_csv {
        let result = LegacyImporter::new(&store).import(csv_path)?;
        if !result.already_imported {
            info!(
                imported = result.imported,
                skipped = result.skipped,
                already_present = result.already_present,
                "legacy records imported"
            );
        }
    }

    let stats = StatsCollector::new(&store).collect()?;
    info!(
        records = stats.record_count,
        archives = stats.archive_file_count,
        size = %StoreStats::format_size(stats.total_size()),
        "record store ready"
    );

    let gate: Arc<dyn AccessGate> =
        Arc::new(StaticAccessGate::from_user_list(config.users.as_deref())?);
    let tokens = TokenIssuer::new(&config.resolve_jwt_secret()?)?.with_ttl(config.token_ttl);

    let state = Arc::new(AppState::new(store, gate, tokens, config.catalog.clone()));

    let listener = TcpListener::bind(config.bind_addr).await?;
    serve(listener, state, shutdown_signal()).await?;

    info!("server stopped");
    Ok(())
}
