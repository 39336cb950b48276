use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use floodgate_config::RegulatorConfig;
use floodgate_regulator::{CatalogClient, RateRegulator};
use floodgate_store::RedisStore;
use floodgate_types::MonotonicClock;

#[derive(Parser)]
#[command(name = "floodgate-regulator")]
#[command(about = "Adaptive crawl rate-limit regulator")]
struct Args {
    /// Shared-store connection string; overrides STORE_DSN.
    #[arg(long)]
    store_dsn: Option<String>,

    /// Catalog base URL; overrides CATALOG_URL.
    #[arg(long)]
    catalog_url: Option<String>,

    /// Tick period in seconds; overrides TICK_SECONDS.
    #[arg(long)]
    tick_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let args = Args::parse();

    // A catalog URL on the command line satisfies the one required variable.
    if let Some(url) = &args.catalog_url {
        std::env::set_var("CATALOG_URL", url);
    }
    // Configuration errors are fatal; the regulator refuses to run on them.
    let mut config = RegulatorConfig::from_env()?;
    if let Some(dsn) = args.store_dsn {
        config.store_dsn = dsn;
    }
    if let Some(secs) = args.tick_seconds {
        config.tick = std::time::Duration::from_secs(secs);
    }
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        catalog_url = %config.catalog_url,
        store_dsn = %config.store_dsn,
        tick_secs = config.tick.as_secs(),
        "starting floodgate regulator"
    );

    let store = Arc::new(RedisStore::connect(&config.store_dsn).await?);
    let catalog = CatalogClient::new(&config.catalog_url, config.catalog_timeout)?;
    let regulator = RateRegulator::new(config, store, catalog, MonotonicClock::new());

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
        tracing::info!("shutdown signal received");
    };

    tokio::select! {
        _ = regulator.run() => {}
        _ = shutdown => {}
    }

    regulator.stop();
    tracing::info!("floodgate regulator shutdown complete");
    Ok(())
}
