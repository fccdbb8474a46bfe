// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coin_topup_server::{
    api::router,
    bank_poller::BankPoller,
    config::{AppConfig, LOG_FORMAT_ENV},
    providers::MbBankClient,
    state::AppState,
    storage::LedgerDatabase,
};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        _ => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!(error = %e, data_dir = %config.data_dir.display(), "Failed to create data directory");
        std::process::exit(1);
    }

    let ledger_path = config.ledger_path();
    let ledger = match LedgerDatabase::open(&ledger_path) {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            error!(error = %e, path = %ledger_path.display(), "Failed to open ledger");
            std::process::exit(1);
        }
    };
    info!(path = %ledger_path.display(), "Ledger opened");

    let config = Arc::new(config);
    let shutdown = CancellationToken::new();
    let mut state = AppState::new(ledger.clone(), config.clone());

    match config.mbbank.as_ref().map(MbBankClient::new) {
        Some(Ok(client)) => {
            let client = Arc::new(client);
            state = state.with_bank_client(client.clone());
            let poller = BankPoller::new(
                ledger.clone(),
                client,
                config.bank_poll_interval,
                config.late_payment_grace,
            );
            tokio::spawn(poller.run(shutdown.clone()));
        }
        Some(Err(e)) => {
            warn!(error = %e, "Bank listing client unavailable; poller disabled");
        }
        None => {
            info!("MBBANK_API_KEY not set; bank poller disabled");
        }
    }

    if config.webhook_secret.is_none() {
        warn!("WEBHOOK_SECRET not set; webhook deliveries will be refused");
    }

    let app = router(state);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, host = %config.host, port = config.port, "Invalid bind address");
            std::process::exit(1);
        }
    };

    tokio::spawn(shutdown_signal(shutdown.clone()));

    match config.tls.as_ref() {
        Some(tls) => {
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");

            let tls_config = match RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await {
                Ok(tls_config) => tls_config,
                Err(e) => {
                    error!(error = %e, cert = %tls.cert_path.display(), "Failed to load TLS credentials");
                    std::process::exit(1);
                }
            };

            let handle = axum_server::Handle::new();
            let graceful = handle.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                graceful.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            info!(%addr, "Coin top-up server listening on https (docs at /docs)");
            if let Err(e) = axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
            {
                error!(error = %e, "HTTPS server failed");
            }
        }
        None => {
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!(error = %e, %addr, "Failed to bind");
                    std::process::exit(1);
                }
            };

            info!(%addr, "Coin top-up server listening on http (docs at /docs)");
            let token = shutdown.clone();
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                error!(error = %e, "HTTP server failed");
            }
        }
    }

    shutdown.cancel();
    info!("Server stopped");
}
