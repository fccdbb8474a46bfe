// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-demand bank sync for operators.
//!
//! Runs the same sweep as the background poller and returns its counters.
//! Restricted to `service_role` tokens.

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::{error, info};

use crate::{
    auth::ServiceOnly,
    bank_poller::sync_once,
    error::ApiError,
    models::BankSyncResponse,
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/payments/bank-sync",
    tag = "Payments",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Sweep completed", body = BankSyncResponse),
        (status = 403, description = "Caller is not a service role"),
        (status = 500, description = "Bank listing failed"),
        (status = 503, description = "Bank listing API not configured")
    )
)]
pub async fn bank_sync(
    ServiceOnly(caller): ServiceOnly,
    State(state): State<AppState>,
) -> Result<Json<BankSyncResponse>, ApiError> {
    let client = state
        .bank_client
        .as_deref()
        .ok_or_else(|| ApiError::service_unavailable("Bank listing API not configured"))?;

    let report = sync_once(
        &state.ledger,
        client,
        state.config.late_payment_grace,
        Utc::now(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, caller = %caller.user_id, "Manual bank sync failed");
        ApiError::internal(format!("Bank sync failed: {e}"))
    })?;

    info!(
        caller = %caller.user_id,
        fetched = report.fetched,
        credited = report.credited,
        "Manual bank sync complete"
    );

    Ok(Json(BankSyncResponse {
        success: true,
        report,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn unconfigured_bank_api_is_service_unavailable() {
        let (state, _dir) = test_state();
        let caller = ServiceOnly(AuthenticatedUser {
            user_id: "ops".to_string(),
            role: Role::ServiceRole,
            session_id: None,
            expires_at: 0,
        });

        let err = bank_sync(caller, State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
