// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Matching bank transfers to payment sessions.
//!
//! Shared by the webhook receiver and the bank poller so both channels apply
//! the same code convention and the same atomic settlement.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::{code, payload::BankTransfer};
use crate::storage::{
    LedgerDatabase, LedgerResult, SettlementChannel, SettlementOutcome, TransferSettlement,
};

/// Result of reconciling one bank transfer.
#[derive(Debug, Clone)]
pub enum Reconciliation {
    /// The memo carried no `NAPXU########` code; nothing was written.
    NoCode,
    /// A code was found and settlement ran.
    Settled {
        transaction_code: String,
        reference: String,
        outcome: SettlementOutcome,
    },
}

impl Reconciliation {
    /// Whether the transfer credited a wallet.
    pub fn is_credited(&self) -> bool {
        matches!(
            self,
            Reconciliation::Settled {
                outcome: SettlementOutcome::Credited { .. },
                ..
            }
        )
    }

    /// Coins credited by this transfer, if any.
    pub fn coins_added(&self) -> Option<u64> {
        match self {
            Reconciliation::Settled {
                outcome: SettlementOutcome::Credited { session, .. },
                ..
            } => Some(session.coins_amount),
            _ => None,
        }
    }

    /// Caller-facing description of the outcome.
    pub fn message(&self) -> String {
        match self {
            Reconciliation::NoCode => "No transaction code found".to_string(),
            Reconciliation::Settled { outcome, .. } => match outcome {
                SettlementOutcome::Credited { .. } => "Payment processed successfully".to_string(),
                SettlementOutcome::AlreadyProcessed { .. } => {
                    "Transaction already processed".to_string()
                }
                SettlementOutcome::SessionNotFound { .. } => "Payment session not found".to_string(),
                SettlementOutcome::SessionExpired { .. } => "Payment session expired".to_string(),
                SettlementOutcome::AmountMismatch {
                    expected, received, ..
                } => format!("Amount mismatch: expected {expected}, received {received}"),
            },
        }
    }
}

/// Settle a bank transfer against the session named by its memo.
///
/// The idempotency reference is the provider transaction id, or the
/// transaction code when the provider sent none. Credits are logged at info;
/// transfers left uncredited are logged at debug and reported by the caller.
pub fn reconcile(
    ledger: &LedgerDatabase,
    transfer: &BankTransfer,
    channel: SettlementChannel,
    grace: Duration,
    now: DateTime<Utc>,
) -> LedgerResult<Reconciliation> {
    let Some(transaction_code) = code::extract_code(&transfer.description) else {
        debug!(
            channel = ?channel,
            provider_id = ?transfer.provider_id,
            "Bank transfer without transaction code ignored"
        );
        return Ok(Reconciliation::NoCode);
    };
    let reference = transfer
        .provider_id
        .clone()
        .unwrap_or_else(|| transaction_code.clone());

    let outcome = ledger.settle_transfer(&TransferSettlement {
        reference: &reference,
        transaction_code: &transaction_code,
        amount_vnd: transfer.amount_vnd,
        channel,
        now,
        grace,
    })?;

    match &outcome {
        SettlementOutcome::Credited { session, coin_transaction } => info!(
            session_id = %session.id,
            user_id = %session.user_id,
            transaction_code = %transaction_code,
            reference = %reference,
            coins_added = session.coins_amount,
            balance_after = coin_transaction.balance_after,
            channel = ?channel,
            "Payment credited"
        ),
        SettlementOutcome::AlreadyProcessed { record } => info!(
            reference = %reference,
            session_id = %record.session_id,
            channel = ?channel,
            "Bank transaction already processed"
        ),
        SettlementOutcome::SessionNotFound { existing } => debug!(
            transaction_code = %transaction_code,
            reference = %reference,
            existing_status = ?existing.as_ref().map(|s| s.status),
            channel = ?channel,
            "No pending payment session for transaction code"
        ),
        SettlementOutcome::SessionExpired { session } => debug!(
            session_id = %session.id,
            transaction_code = %transaction_code,
            reference = %reference,
            expires_at = %session.expires_at,
            channel = ?channel,
            "Transfer arrived after session expiry"
        ),
        SettlementOutcome::AmountMismatch {
            session,
            expected,
            received,
        } => debug!(
            session_id = %session.id,
            transaction_code = %transaction_code,
            reference = %reference,
            expected,
            received,
            channel = ?channel,
            "Underpaid transfer left session pending"
        ),
    }

    Ok(Reconciliation::Settled {
        transaction_code,
        reference,
        outcome,
    })
}
