use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bazicash_proxy::api::{self, AppState};
use bazicash_proxy::config::{self, DataSourceKind};
use bazicash_proxy::shopify::ShopifyClient;
use bazicash_proxy::source::{FixtureSource, StoreCreditSource};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("BaziCash proxy starting...");

    let cfg = Arc::new(config::load()?);
    info!("  Store: {}", cfg.store_domain);
    info!("  API version: {}", cfg.api_version);
    info!("  Port: {}", cfg.port);
    info!("  Data source: {:?}", cfg.data_source);

    if cfg.api_secret.is_none() {
        warn!("SHOPIFY_API_SECRET not set: every proxy request will be rejected");
    }

    let source: Arc<dyn StoreCreditSource> = match cfg.data_source {
        DataSourceKind::Live => Arc::new(ShopifyClient::new(&cfg)?),
        DataSourceKind::Fixture => {
            warn!("Serving fixture data, not the live store");
            Arc::new(FixtureSource::demo())
        }
    };

    let state = AppState::new(Arc::clone(&cfg), source);
    let api_handle = tokio::spawn(api::serve(state));

    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("BaziCash proxy stopped.");
    Ok(())
}
