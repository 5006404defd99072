//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::services::ingest::IngestService;
use crate::state::AppState;
use anyhow::{Context, Result};
use ibc_core::IbcConfig;
use ibc_infra::{DiagnosticLogSink, NonceService};
use ibc_services::{AssetFetcher, UrlPolicy};
use ibc_storage::LocalMediaLibrary;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared state and router
pub async fn initialize_app(config: IbcConfig) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;

    let library = LocalMediaLibrary::new(&config.uploads_dir, config.uploads_url.clone())
        .await
        .with_context(|| {
            format!(
                "Failed to initialize media library at {}",
                config.uploads_dir.display()
            )
        })?;
    tracing::info!(
        path = %config.uploads_dir.display(),
        url = %config.uploads_url,
        "Media library initialized"
    );

    tokio::fs::create_dir_all(&config.temp_dir)
        .await
        .with_context(|| format!("Failed to create temp dir {}", config.temp_dir.display()))?;

    let policy = UrlPolicy::new(
        config.download_allowed_hosts.clone(),
        config.download_allow_private,
    );
    tracing::info!(
        allowed_hosts = ?policy.allowed_hosts,
        allow_private = policy.allow_private_ips,
        "Download policy configured"
    );
    let fetcher = AssetFetcher::new(
        &config.temp_dir,
        Duration::from_secs(config.download_timeout_secs),
        policy,
    )
    .context("Failed to build HTTP client")?;

    let nonces = NonceService::new(&config.nonce_secret, config.nonce_lifetime_secs);
    let diagnostics = DiagnosticLogSink::new(config.log_dir(), config.log_enabled);
    let ingest = IngestService::new(nonces.clone(), fetcher, Arc::new(library));

    let state = Arc::new(AppState {
        config,
        ingest,
        diagnostics,
        nonces,
    });

    let router = routes::setup_routes(&state.config, state.clone())?;

    Ok((state, router))
}
