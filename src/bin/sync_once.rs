// One-shot stock sync for cron jobs and manual runs.

use anyhow::Result;
use clap::Parser;
use forecourt::providers::autotrader::{AutoTraderConfig, AutoTraderProvider};
use forecourt::store::db::Db;
use forecourt::store::stock::StockStore;
use forecourt::sync::{SyncEngine, SyncOutcome};
use forecourt::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "sync_once", version, about = "Run one stock sync and exit")]
struct Cli {
    /// Optional override for the database URL
    #[arg(long)]
    db_url: Option<String>,

    /// Override the advertiser whose stock is synced
    #[arg(long)]
    advertiser_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    forecourt::logging::init_tracing("info,sqlx=warn")?;
    env_util::init_env();

    let cli = Cli::parse();

    env_util::preflight_check(
        "forecourt sync_once",
        &["AUTOTRADER_KEY", "AUTOTRADER_SECRET"],
        &["AUTOTRADER_BASE_URL", "AUTOTRADER_ADVERTISER_ID", "DATABASE_URL"],
    )?;

    let config = AutoTraderConfig::from_env()?;
    let advertiser_id = cli
        .advertiser_id
        .unwrap_or_else(|| config.advertiser_id.clone());

    let database_url = match cli.db_url {
        Some(url) => url,
        None => env_util::db_url()?,
    };
    let db = Db::connect(&database_url, 5).await?;

    let engine = SyncEngine::new(
        AutoTraderProvider::new(config)?,
        StockStore::new(db),
        advertiser_id,
    );

    match engine.run_sync().await {
        SyncOutcome::Success { total_listings } => {
            println!("sync complete: {total_listings} active listings cached");
            Ok(())
        }
        SyncOutcome::Skipped => {
            println!("sync skipped: another run is in progress");
            Ok(())
        }
        SyncOutcome::Failed { error } => Err(error.into()),
    }
}
