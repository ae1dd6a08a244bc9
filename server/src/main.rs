//! RateQuote Service Binary
//!
//! Serves the quote HTTP API and runs the background scheduler that turns
//! pending refresh requests into resolved quotes.

mod config;
mod http;

use std::sync::Arc;

use anyhow::Context;
use ratequote_engine::{LifecycleEngine, Scheduler};
use ratequote_rates::FxRatesApiSource;
use ratequote_store::MemoryStore;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServiceConfig;
use crate::http::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting RateQuote service");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        anyhow::bail!("configuration error: {e}");
    }

    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(
        FxRatesApiSource::new(
            config.source.base_url.clone(),
            config.source.api_key.clone(),
            config.source.timeout,
        )
        .context("failed to build rate source")?,
    );

    let engine = Arc::new(LifecycleEngine::new(store.clone(), source));
    let scheduler = Arc::new(Scheduler::new(engine, config.engine.interval));
    scheduler.start();

    let state = AppState {
        store,
        supported_currencies: Arc::new(config.supported_currencies.clone()),
    };
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %addr,
        interval_secs = config.engine.interval.as_secs(),
        "RateQuote service listening"
    );

    let shutdown_scheduler = scheduler.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                error!("Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            shutdown_scheduler.stop();
        })
        .await?;

    info!("RateQuote service shutdown complete");
    Ok(())
}
