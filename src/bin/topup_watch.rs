// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Open a top-up session and wait for it to settle.
//!
//! ```text
//! TOPUP_API_URL=https://localhost:8080 TOPUP_ACCESS_TOKEN=... topup-watch pkg_50k [mbbank|momo]
//! ```
//!
//! Closing the watcher (Ctrl-C) only stops polling; the session stays open
//! on the server until it is paid or expires.

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coin_topup_server::{
    client::{SessionWatcher, TopupClient, WatchOutcome},
    payments::QrProvider,
};

const API_URL_ENV: &str = "TOPUP_API_URL";
const ACCESS_TOKEN_ENV: &str = "TOPUP_ACCESS_TOKEN";
const DEFAULT_API_URL: &str = "http://localhost:8080";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(package_id) = args.next() else {
        error!("usage: topup-watch <package_id> [mbbank|momo]");
        return ExitCode::from(2);
    };
    let provider = match args.next().map(|p| p.parse::<QrProvider>()).transpose() {
        Ok(provider) => provider.unwrap_or_default(),
        Err(e) => {
            error!(error = %e, "Invalid provider");
            return ExitCode::from(2);
        }
    };

    let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) else {
        error!("{ACCESS_TOKEN_ENV} must be set");
        return ExitCode::from(2);
    };
    let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());

    let client = match TopupClient::new(&base_url, &token) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build client");
            return ExitCode::FAILURE;
        }
    };

    let session = match client.create_session(&package_id, provider).await {
        Ok(session) => session,
        Err(e) => {
            error!(error = %e, package_id = %package_id, "Failed to open payment session");
            return ExitCode::FAILURE;
        }
    };

    info!(
        session_id = %session.id,
        amount_vnd = session.amount_vnd,
        coins = session.coins_amount,
        expires_at = %session.expires_at,
        "Payment session opened"
    );
    info!(qr_code_url = %session.qr_code_url, "Scan this QR code");
    info!(transfer_content = %session.transfer_content, "Use this exact transfer content");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    match SessionWatcher::new(client).watch(&session.id, cancel).await {
        WatchOutcome::Completed { coins_added } => {
            info!(coins_added, "Top-up complete");
            ExitCode::SUCCESS
        }
        WatchOutcome::Expired => {
            error!("Payment session expired before payment arrived");
            ExitCode::FAILURE
        }
        WatchOutcome::TimedOut => {
            error!("Stopped waiting; the session may still be paid later");
            ExitCode::FAILURE
        }
        WatchOutcome::Cancelled => {
            info!("Watch cancelled");
            ExitCode::SUCCESS
        }
    }
}
