// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coin wallet endpoints.
//!
//! Balances live in the ledger; every change is mirrored by a coin
//! transaction, so `ledger_total` doubles as a consistency check.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use tracing::{info, warn};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{CoinTransactionsResponse, SpendRequest, SpendResponse, TransactionsQuery, WalletResponse},
    state::AppState,
};

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 200;

#[utoipa::path(
    get,
    path = "/v1/wallet",
    tag = "Wallet",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current coin balance", body = WalletResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WalletResponse>, ApiError> {
    let total_coins = state.ledger.balance(&user.user_id)?;
    let ledger_total = state.ledger.ledger_total(&user.user_id)?;
    let consistent = i64::try_from(total_coins).is_ok_and(|b| b == ledger_total);
    if !consistent {
        warn!(
            user_id = %user.user_id,
            total_coins,
            ledger_total,
            "Wallet balance disagrees with coin ledger"
        );
    }

    Ok(Json(WalletResponse {
        user_id: user.user_id,
        total_coins,
        ledger_total,
        consistent,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/wallet/transactions",
    tag = "Wallet",
    params(TransactionsQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coin history, newest first", body = CoinTransactionsResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<CoinTransactionsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let transactions = state.ledger.list_coin_transactions(&user.user_id, limit)?;
    Ok(Json(CoinTransactionsResponse { transactions }))
}

#[utoipa::path(
    post,
    path = "/v1/wallet/spend",
    tag = "Wallet",
    request_body = SpendRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Coins debited", body = SpendResponse),
        (status = 400, description = "Zero amount"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Insufficient coins")
    )
)]
pub async fn spend(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<SpendRequest>,
) -> Result<Json<SpendResponse>, ApiError> {
    let transaction = state.ledger.spend(
        &user.user_id,
        request.amount,
        &request.description,
        request.reference_id.as_deref(),
        Utc::now(),
    )?;

    info!(
        user_id = %user.user_id,
        amount = request.amount,
        balance_after = transaction.balance_after,
        "Coins spent"
    );

    Ok(Json(SpendResponse {
        success: true,
        total_coins: transaction.balance_after,
        transaction,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, Role};
    use crate::payments::{open_session, reconcile, BankTransfer, QrProvider};
    use crate::state::test_support::test_state;
    use crate::storage::{CoinTransactionType, SettlementChannel};
    use axum::http::StatusCode;

    fn user(user_id: &str) -> Auth {
        Auth(AuthenticatedUser {
            user_id: user_id.to_string(),
            role: Role::Authenticated,
            session_id: None,
            expires_at: 0,
        })
    }

    fn fund(state: &AppState, user_id: &str, package_id: &str) {
        let now = Utc::now();
        let session =
            open_session(&state.ledger, &state.config, user_id, package_id, QrProvider::MbBank, now).unwrap();
        let transfer = BankTransfer {
            description: session.transfer_content.clone(),
            amount_vnd: session.amount_vnd,
            provider_id: Some(format!("FT-{}", session.id)),
        };
        let result = reconcile(&state.ledger, &transfer, SettlementChannel::Webhook, chrono::Duration::zero(), now)
            .unwrap();
        assert!(result.is_credited());
    }

    fn spend_request(amount: u64) -> Json<SpendRequest> {
        Json(SpendRequest {
            amount,
            description: "Sticker pack".to_string(),
            reference_id: Some("order-1".to_string()),
        })
    }

    #[tokio::test]
    async fn empty_wallet_is_consistent() {
        let (state, _dir) = test_state();
        let Json(wallet) = get_wallet(user("user-1"), State(state)).await.unwrap();
        assert_eq!(wallet.total_coins, 0);
        assert_eq!(wallet.ledger_total, 0);
        assert!(wallet.consistent);
    }

    #[tokio::test]
    async fn spend_debits_and_keeps_ledger_consistent() {
        let (state, _dir) = test_state();
        fund(&state, "user-1", "pkg_50k");

        let Json(spent) = spend(user("user-1"), State(state.clone()), spend_request(200))
            .await
            .unwrap();
        assert!(spent.success);
        assert_eq!(spent.total_coins, 350);
        assert_eq!(spent.transaction.amount, -200);
        assert_eq!(spent.transaction.transaction_type, CoinTransactionType::Spend);

        let Json(wallet) = get_wallet(user("user-1"), State(state.clone())).await.unwrap();
        assert_eq!(wallet.total_coins, 350);
        assert_eq!(wallet.ledger_total, 350);
        assert!(wallet.consistent);

        let Json(history) = list_transactions(
            user("user-1"),
            State(state),
            Query(TransactionsQuery { limit: None }),
        )
        .await
        .unwrap();
        assert_eq!(history.transactions.len(), 2);
        assert_eq!(history.transactions[0].transaction_type, CoinTransactionType::Spend);
        assert_eq!(history.transactions[1].transaction_type, CoinTransactionType::Purchase);
    }

    #[tokio::test]
    async fn spend_rejects_zero_and_overdraft() {
        let (state, _dir) = test_state();
        fund(&state, "user-1", "pkg_10k");

        let err = spend(user("user-1"), State(state.clone()), spend_request(0))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = spend(user("user-1"), State(state.clone()), spend_request(101))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.ledger.balance("user-1").unwrap(), 100);
    }

    #[tokio::test]
    async fn history_limit_is_clamped() {
        let (state, _dir) = test_state();
        fund(&state, "user-1", "pkg_500k");
        for _ in 0..3 {
            spend(user("user-1"), State(state.clone()), spend_request(1)).await.unwrap();
        }

        let Json(history) = list_transactions(
            user("user-1"),
            State(state.clone()),
            Query(TransactionsQuery { limit: Some(2) }),
        )
        .await
        .unwrap();
        assert_eq!(history.transactions.len(), 2);

        let Json(history) = list_transactions(
            user("user-1"),
            State(state),
            Query(TransactionsQuery { limit: Some(10_000) }),
        )
        .await
        .unwrap();
        assert_eq!(history.transactions.len(), 4);
    }
}
