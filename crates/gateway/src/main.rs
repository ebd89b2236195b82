//! Gateway entry point.
//!
//! Boots the offline cache gateway: load configuration, open the stores, run
//! install and activate (skip-waiting: activation follows install directly),
//! then serve.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use url::Url;

use sojourn_client::{FetchConfig, UpstreamClient};
use sojourn_core::{AppConfig, StoreDb};
use sojourn_gateway::{Gateway, server};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let upstream = Url::parse(&config.upstream).context("parsing upstream url")?;

    tracing::info!(
        listen = %config.listen_addr,
        upstream = %upstream,
        version = %config.cache_version,
        "starting sojourn offline gateway"
    );

    let db = StoreDb::open(&config.db_path).await.context("opening store database")?;
    let fetcher = UpstreamClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
    })
    .context("building upstream client")?;

    let gateway = Gateway::new(
        db,
        config.store_names(),
        Arc::new(fetcher),
        upstream.clone(),
        config.seed_manifest.clone(),
    );

    // A failed install leaves the previous build's stores untouched.
    gateway.install().await.context("install step failed")?;
    let deleted = gateway.activate().await.context("activate step failed")?;
    if !deleted.is_empty() {
        tracing::info!(count = deleted.len(), "purged stale stores");
    }

    let app = server::router(Arc::new(gateway), upstream);
    let listener = tokio::net::TcpListener::bind(config.listen_addr.as_str())
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler");
    }
    tracing::info!("shutting down");
}
