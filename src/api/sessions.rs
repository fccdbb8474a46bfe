// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CreateSessionRequest, PaymentSessionView, SessionListResponse},
    payments::open_session,
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/payments/sessions",
    request_body = CreateSessionRequest,
    tag = "Payments",
    responses(
        (status = 201, body = PaymentSessionView),
        (status = 400, description = "Unknown package or provider not configured"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_session(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<PaymentSessionView>), ApiError> {
    let now = Utc::now();
    let session = open_session(
        &state.ledger,
        &state.config,
        &user.user_id,
        &request.package_id,
        request.provider,
        now,
    )?;
    let view = PaymentSessionView::from_stored(session, now, state.config.late_payment_grace);
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/v1/payments/sessions",
    tag = "Payments",
    responses((status = 200, body = SessionListResponse)),
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let now = Utc::now();
    let grace = state.config.late_payment_grace;
    let sessions = state
        .ledger
        .list_sessions_for_user(&user.user_id)?
        .into_iter()
        .map(|s| PaymentSessionView::from_stored(s, now, grace))
        .collect();
    Ok(Json(SessionListResponse { sessions }))
}

#[utoipa::path(
    get,
    path = "/v1/payments/sessions/{session_id}",
    params(
        ("session_id" = String, Path, description = "Payment session identifier")
    ),
    tag = "Payments",
    responses(
        (status = 200, body = PaymentSessionView),
        (status = 403, description = "Session belongs to another user"),
        (status = 404, description = "Session not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    Auth(user): Auth,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PaymentSessionView>, ApiError> {
    let session = state
        .ledger
        .get_session(&session_id)?
        .ok_or_else(|| ApiError::not_found("Payment session not found"))?;

    if session.user_id != user.user_id {
        return Err(ApiError::forbidden("Payment session belongs to another user"));
    }

    Ok(Json(PaymentSessionView::from_stored(
        session,
        Utc::now(),
        state.config.late_payment_grace,
    )))
}
