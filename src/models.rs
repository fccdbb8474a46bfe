// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. Session views also derive `Deserialize` because the
//! top-up client reads them back.
//!
//! ## Model Categories
//!
//! - **Packages**: Coin package catalogue
//! - **Payment Sessions**: Top-up intents and their QR payloads
//! - **Webhook**: Bank notification results
//! - **Wallet**: Balance, coin history, and spending

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::bank_poller::SyncReport;
use crate::payments::{packages::CoinPackage, qr::QrProvider, sessions};
use crate::storage::{SessionStatus, StoredCoinTransaction, StoredPaymentSession};

// =============================================================================
// Package Models
// =============================================================================

/// Coin packages available for purchase.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackagesResponse {
    pub packages: Vec<CoinPackage>,
}

// =============================================================================
// Payment Session Models
// =============================================================================

/// Request to open a payment session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Package to buy.
    pub package_id: String,
    /// QR provider; defaults to MB Bank.
    #[serde(default)]
    pub provider: QrProvider,
}

/// A payment session as seen by its owner.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PaymentSessionView {
    pub id: String,
    pub package_id: String,
    /// Amount to transfer, in VND.
    pub amount_vnd: u64,
    /// Coins credited on completion.
    pub coins_amount: u64,
    /// Memo the payer must use.
    pub transfer_content: String,
    pub transaction_code: String,
    pub qr_code_url: String,
    pub provider: QrProvider,
    /// Status at the time of the request; stale pending sessions read as
    /// `expired`.
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds left to pay; zero once the session is not pending.
    pub seconds_remaining: u64,
}

impl PaymentSessionView {
    pub fn from_stored(session: StoredPaymentSession, now: DateTime<Utc>, grace: Duration) -> Self {
        let status = session.effective_status(now, grace);
        let seconds_remaining = if status == SessionStatus::Pending {
            sessions::seconds_remaining(&session, now)
        } else {
            0
        };
        Self {
            id: session.id,
            package_id: session.package_id,
            amount_vnd: session.amount_vnd,
            coins_amount: session.coins_amount,
            transfer_content: session.transfer_content,
            transaction_code: session.transaction_code,
            qr_code_url: session.qr_code_url,
            provider: session.provider,
            status,
            created_at: session.created_at,
            expires_at: session.expires_at,
            completed_at: session.completed_at,
            seconds_remaining,
        }
    }
}

/// The caller's payment sessions, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<PaymentSessionView>,
}

// =============================================================================
// Webhook Models
// =============================================================================

/// Result of a bank webhook delivery.
///
/// Business outcomes (no code, duplicate, no session, underpayment) answer
/// 200 with `success: false` so the sender does not retry them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins_added: Option<u64>,
    /// Session holding the code when it was no longer pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<StoredPaymentSession>,
}

/// Result of an on-demand bank sync.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BankSyncResponse {
    pub success: bool,
    pub report: SyncReport,
}

// =============================================================================
// Wallet Models
// =============================================================================

/// Wallet balance with a ledger consistency check.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub user_id: String,
    pub total_coins: u64,
    /// Sum of every coin transaction.
    pub ledger_total: i64,
    /// Whether `ledger_total` equals `total_coins`.
    pub consistent: bool,
}

/// Query parameters for the coin history.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionsQuery {
    /// Maximum entries to return (default 50, max 200).
    pub limit: Option<usize>,
}

/// Coin history, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CoinTransactionsResponse {
    pub transactions: Vec<StoredCoinTransaction>,
}

/// Request to spend coins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpendRequest {
    pub amount: u64,
    pub description: String,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// Result of a successful spend.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpendResponse {
    pub success: bool,
    pub total_coins: u64,
    pub transaction: StoredCoinTransaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewPaymentSession;

    fn stored(now: DateTime<Utc>) -> StoredPaymentSession {
        StoredPaymentSession::new_pending(
            NewPaymentSession {
                user_id: "user-1".to_string(),
                package_id: "pkg_50k".to_string(),
                amount_vnd: 50_000,
                coins_amount: 550,
                transfer_content: "NAPXU12345678 9a8b7c6d".to_string(),
                transaction_code: "NAPXU12345678".to_string(),
                qr_code_url: "https://img.vietqr.io/image/x.png".to_string(),
                provider: QrProvider::MbBank,
            },
            now,
            Duration::minutes(10),
        )
    }

    #[test]
    fn view_reports_expired_for_stale_pending_session() {
        let now = Utc::now();
        let view = PaymentSessionView::from_stored(stored(now), now + Duration::minutes(11), Duration::zero());
        assert_eq!(view.status, SessionStatus::Expired);
        assert_eq!(view.seconds_remaining, 0);
    }

    #[test]
    fn create_request_defaults_to_mbbank() {
        let request: CreateSessionRequest = serde_json::from_str(r#"{"package_id":"pkg_10k"}"#).unwrap();
        assert_eq!(request.provider, QrProvider::MbBank);
    }

    #[test]
    fn webhook_response_omits_empty_fields() {
        let response = WebhookResponse {
            success: false,
            message: "No transaction code found".to_string(),
            coins_added: None,
            session: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"success": false, "message": "No transaction code found"})
        );
    }
}
