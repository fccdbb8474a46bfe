// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted ledger records: payment sessions, coin transactions, and
//! processed bank transactions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::payments::qr::QrProvider;

/// Payment session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for a matching bank transfer.
    Pending,
    /// Credited. Terminal.
    Completed,
    /// Lifetime elapsed without a creditable transfer. Terminal.
    Expired,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Pending)
    }
}

/// Persisted top-up intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredPaymentSession {
    /// Unique session identifier.
    pub id: String,
    /// Owner user ID.
    pub user_id: String,
    /// Coin package selected by the user.
    pub package_id: String,
    /// Transfer amount expected, in VND.
    pub amount_vnd: u64,
    /// Coins credited on completion (package coins + bonus).
    pub coins_amount: u64,
    /// Full memo the payer is asked to use.
    pub transfer_content: String,
    /// `NAPXU` + 8 digits; the matching key.
    pub transaction_code: String,
    /// Provider-rendered QR image URL.
    pub qr_code_url: String,
    /// QR provider the session was rendered for.
    pub provider: QrProvider,
    /// Current status.
    pub status: SessionStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time after which the session stops being creditable.
    pub expires_at: DateTime<Utc>,
    /// Completion time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Bank reference of the settling transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_reference: Option<String>,
}

/// Inputs for a new pending session.
pub struct NewPaymentSession {
    pub user_id: String,
    pub package_id: String,
    pub amount_vnd: u64,
    pub coins_amount: u64,
    pub transfer_content: String,
    pub transaction_code: String,
    pub qr_code_url: String,
    pub provider: QrProvider,
}

impl StoredPaymentSession {
    /// Construct a pending session living for `ttl` from `now`.
    pub fn new_pending(new: NewPaymentSession, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: new.user_id,
            package_id: new.package_id,
            amount_vnd: new.amount_vnd,
            coins_amount: new.coins_amount,
            transfer_content: new.transfer_content,
            transaction_code: new.transaction_code,
            qr_code_url: new.qr_code_url,
            provider: new.provider,
            status: SessionStatus::Pending,
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            completed_at: None,
            bank_reference: None,
        }
    }

    /// Whether a pending session can no longer be credited at `now`.
    ///
    /// A deadline past the representable range never goes stale.
    pub fn is_stale(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        !self.status.is_terminal()
            && self
                .expires_at
                .checked_add_signed(grace)
                .is_some_and(|deadline| now > deadline)
    }

    /// Status as observed at `now`: a stale pending session reads as expired
    /// even before the sweep persists it.
    pub fn effective_status(&self, now: DateTime<Utc>, grace: Duration) -> SessionStatus {
        if self.is_stale(now, grace) {
            SessionStatus::Expired
        } else {
            self.status
        }
    }
}

/// Coin ledger entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoinTransactionType {
    /// Coins bought through a bank top-up.
    Purchase,
    /// Coins spent inside the app.
    Spend,
}

/// Append-only coin ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredCoinTransaction {
    pub id: String,
    pub user_id: String,
    pub transaction_type: CoinTransactionType,
    /// Signed coin delta.
    pub amount: i64,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    /// Wallet balance right after this entry was applied.
    pub balance_after: u64,
    pub created_at: DateTime<Utc>,
}

/// How a bank transaction reached the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SettlementChannel {
    Webhook,
    Polling,
}

/// Bank transaction that has been credited; its key is the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredBankTransaction {
    /// Provider transaction id, or the transaction code when none was given.
    pub transaction_id: String,
    pub user_id: String,
    pub session_id: String,
    pub amount_vnd: u64,
    pub coins_added: u64,
    pub channel: SettlementChannel,
    pub processed_at: DateTime<Utc>,
}
