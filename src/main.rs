// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio_util::sync::CancellationToken;

use etherstore_server::api::router;
use etherstore_server::auth::SessionKeys;
use etherstore_server::config::AppConfig;
use etherstore_server::content::{ContentStore, MemoryContentStore, PinataClient};
use etherstore_server::ledger::{EvmLedger, InMemoryLedger, Ledger};
use etherstore_server::logging::setup_tracing;
use etherstore_server::metadata::MetadataStore;
use etherstore_server::state::AppState;

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| "failed to install rustls crypto provider")?;

    let config = AppConfig::from_env()?;
    setup_tracing(config.log_format);

    let metadata = Arc::new(MetadataStore::open_in_dir(&config.data_dir)?);

    let ledger: Arc<dyn Ledger> = match config.ledger.clone() {
        Some(ledger_config) => Arc::new(EvmLedger::new(ledger_config)?),
        None => {
            tracing::warn!("RPC_URL not set, using in-memory ledger (development only)");
            Arc::new(InMemoryLedger::new())
        }
    };
    let content: Arc<dyn ContentStore> = match config.pinata.clone() {
        Some(pinata) => Arc::new(PinataClient::new(pinata)),
        None => {
            tracing::warn!("Pinata credentials not set, using in-memory content store (development only)");
            Arc::new(MemoryContentStore::new())
        }
    };

    let sessions = SessionKeys::new(config.jwt_secret.as_bytes(), config.jwt_ttl_secs);
    let state = AppState::new(ledger, content, metadata, sessions, config.chain_id);

    match state.uploads.incomplete_count() {
        Ok(0) => {}
        Ok(count) => tracing::warn!(count, "Incomplete uploads found; owners can resume them"),
        Err(e) => tracing::error!(error = %e, "Failed to scan upload intents"),
    }

    tracing::info!(
        ledger = state.ledger.mode(),
        content_store = state.content.name(),
        chain_id = state.chain_id,
        data_dir = %config.data_dir.display(),
        "EtherStore initialized"
    );

    let app = router(state);

    let shutdown = CancellationToken::new();
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));
    {
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            tracing::info!("Shutdown signal received, draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });
    }

    let addr = config.bind_addr;
    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            tracing::info!(%addr, "EtherStore listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            tracing::info!(%addr, "EtherStore listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
    shutdown.cancel();
}
