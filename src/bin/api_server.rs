// HTTP API server binary for forecourt
// Serves the cached stock list, lookup and sync endpoints, and runs the
// fixed-time sync scheduler in the background.

use anyhow::Result;
use forecourt::api::ApiServer;
use forecourt::providers::autotrader::{AutoTraderConfig, AutoTraderProvider};
use forecourt::providers::ukvd::{UkvdConfig, UkvdProvider};
use forecourt::providers::RegistryLookup;
use forecourt::stock::service::StockService;
use forecourt::store::db::Db;
use forecourt::store::metadata::MetadataStore;
use forecourt::store::stock::StockStore;
use forecourt::sync::{scheduler, SyncEngine};
use forecourt::util::env as env_util;
use std::sync::Arc;
use tokio::sync::broadcast;

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize logging
    forecourt::logging::init_tracing("info,sqlx=warn")?;

    tracing::info!("Initializing forecourt API server");

    // Load dotenv/env once (safe to call multiple times)
    env_util::init_env();

    env_util::preflight_check(
        "forecourt api_server",
        &[
            "AUTOTRADER_KEY",
            "AUTOTRADER_SECRET",
            "AUTOTRADER_ADVERTISER_ID",
            "API_SECRET",
        ],
        &[
            "AUTOTRADER_BASE_URL",
            "AUTOTRADER_ADVERTISER_ID",
            "UKVD_API_KEY",
            "UKVD_ENDPOINT",
            "DATABASE_URL",
            "API_HOST",
            "API_PORT",
            "ALLOWED_ORIGINS",
        ],
    )?;

    // Load configuration from environment
    let server = ApiServer::from_env()?;

    // Initialize database connection
    let database_url = env_util::db_url()?;
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    tracing::info!("Database connected successfully");

    let stock_store = StockStore::new(db.clone());
    let metadata_store = MetadataStore::new(db.clone());

    let config = AutoTraderConfig::from_env()?;
    let advertiser_id = config.advertiser_id.clone();
    let engine = Arc::new(SyncEngine::new(
        AutoTraderProvider::new(config)?,
        stock_store.clone(),
        advertiser_id,
    ));

    let registry: Option<Arc<dyn RegistryLookup>> = match UkvdConfig::from_env() {
        Some(config) => Some(Arc::new(UkvdProvider::new(config)?)),
        None => {
            tracing::info!("UKVD_API_KEY not set, registry fallback disabled");
            None
        }
    };

    let service = StockService::new(stock_store, metadata_store, registry, Arc::clone(&engine));

    // Background scheduler, stopped when the server exits
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(scheduler::run(engine, shutdown_rx));

    // Start HTTP server
    let result = server.run(db, service).await;

    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;

    result
}
