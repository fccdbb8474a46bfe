// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bank transfer webhook.
//!
//! The body is authenticated with an HMAC-SHA256 signature before it is
//! parsed. Business outcomes (no code, duplicate, unknown session,
//! underpayment) answer 200 with `success: false` so the sender stops
//! retrying; only malformed input, bad signatures and storage failures use
//! error statuses.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use tracing::{error, warn};

use crate::{
    error::ApiError,
    models::WebhookResponse,
    payments::{
        payload::parse_webhook_body,
        reconcile,
        signature::{self, SIGNATURE_HEADER},
        Reconciliation,
    },
    state::AppState,
    storage::{SettlementChannel, SettlementOutcome},
};

/// Receive a bank transfer notification.
#[utoipa::path(
    post,
    path = "/v1/payments/webhook",
    tag = "Payments",
    request_body(content = String, description = "Bank transfer notification (JSON)", content_type = "application/json"),
    params(
        ("x-webhook-signature" = String, Header, description = "sha256=<hex HMAC-SHA256 of the raw body>")
    ),
    responses(
        (status = 200, description = "Notification handled", body = WebhookResponse),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Missing or invalid signature"),
        (status = 500, description = "Storage failure"),
        (status = 503, description = "Webhook secret not configured")
    )
)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    authenticate(&state, &headers, &body)?;

    let transfer = parse_webhook_body(&body).map_err(|e| {
        warn!(error = %e, "Rejected webhook payload");
        ApiError::bad_request(e.to_string())
    })?;

    let reconciliation = reconcile(
        &state.ledger,
        &transfer,
        SettlementChannel::Webhook,
        state.config.late_payment_grace,
        Utc::now(),
    )
    .map_err(|e| {
        error!(error = %e, provider_id = ?transfer.provider_id, "Webhook settlement failed");
        ApiError::internal("Failed to process payment")
    })?;

    let message = reconciliation.message();
    let success = reconciliation.is_credited();
    let coins_added = reconciliation.coins_added();
    let duplicate = matches!(
        reconciliation,
        Reconciliation::Settled {
            outcome: SettlementOutcome::AlreadyProcessed { .. },
            ..
        }
    );
    if !success && !duplicate {
        warn!(
            provider_id = ?transfer.provider_id,
            amount_vnd = transfer.amount_vnd,
            outcome = %message,
            "Webhook transfer not credited"
        );
    }
    let session = match reconciliation {
        Reconciliation::Settled {
            outcome: SettlementOutcome::SessionNotFound { existing },
            ..
        } => existing,
        Reconciliation::Settled {
            outcome: SettlementOutcome::SessionExpired { session },
            ..
        } => Some(session),
        _ => None,
    };

    Ok(Json(WebhookResponse {
        success,
        message,
        coins_added,
        session,
    }))
}

fn authenticate(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    let Some(secret) = state.config.webhook_secret.as_deref() else {
        if cfg!(feature = "dev") {
            warn!("WEBHOOK_SECRET not set; accepting unsigned webhook (dev build)");
            return Ok(());
        }
        error!("WEBHOOK_SECRET not set; refusing webhook");
        return Err(ApiError::service_unavailable("Webhook receiver not configured"));
    };

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    signature::verify(secret, body, header).map_err(|e| {
        warn!(error = %e, "Webhook signature rejected");
        ApiError::unauthorized(e.to_string())
    })
}
