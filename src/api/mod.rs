// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    bank_poller::SyncReport,
    models::{
        BankSyncResponse, CoinTransactionsResponse, CreateSessionRequest, PackagesResponse,
        PaymentSessionView, SessionListResponse, SpendRequest, SpendResponse, WalletResponse,
        WebhookResponse,
    },
    payments::{CoinPackage, QrProvider},
    state::AppState,
    storage::{
        CoinTransactionType, SessionStatus, SettlementChannel, StoredCoinTransaction,
        StoredPaymentSession,
    },
};

pub mod bank_sync;
pub mod health;
pub mod packages;
pub mod sessions;
pub mod wallet;
pub mod webhook;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/packages", get(packages::list_packages))
        .route(
            "/payments/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route("/payments/sessions/{session_id}", get(sessions::get_session))
        .route("/payments/webhook", post(webhook::receive_webhook))
        .route(
            "/payments/bank-sync",
            get(bank_sync::bank_sync).post(bank_sync::bank_sync),
        )
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wallet/spend", post(wallet::spend));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(CorsLayer::permissive())
}

/// Registers the bearer token scheme referenced by authenticated paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        health::health,
        health::liveness,
        health::readiness,
        packages::list_packages,
        sessions::create_session,
        sessions::list_sessions,
        sessions::get_session,
        webhook::receive_webhook,
        bank_sync::bank_sync,
        wallet::get_wallet,
        wallet::list_transactions,
        wallet::spend
    ),
    components(
        schemas(
            CoinPackage,
            QrProvider,
            SessionStatus,
            SettlementChannel,
            CoinTransactionType,
            StoredPaymentSession,
            StoredCoinTransaction,
            PackagesResponse,
            CreateSessionRequest,
            PaymentSessionView,
            SessionListResponse,
            WebhookResponse,
            SyncReport,
            BankSyncResponse,
            WalletResponse,
            CoinTransactionsResponse,
            SpendRequest,
            SpendResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Packages", description = "Coin package catalogue"),
        (name = "Payments", description = "Payment sessions and bank reconciliation"),
        (name = "Wallet", description = "Coin balance, history and spending")
    )
)]
struct ApiDoc;
