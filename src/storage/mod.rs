// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger Storage Module
//!
//! Persistent state lives in a single redb database under `DATA_DIR`:
//! wallet balances, the append-only coin ledger, payment sessions and the
//! record of credited bank transfers.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   ledger.redb
//!     profiles              user_id → total_coins
//!     payment_sessions      session_id → session JSON
//!     session_code_index    NAPXU######## → session_id
//!     coin_transactions     user_id|!seq → coin transaction JSON
//!     mbbank_transactions   bank reference → bank transaction JSON
//!     ledger_state          counters
//! ```
//!
//! ## Important Notes
//!
//! - A wallet balance only changes inside a redb write transaction that also
//!   appends the matching coin transaction.
//! - Coin transactions are never updated or deleted.

pub mod ledger;
pub mod records;

pub use ledger::{LedgerDatabase, LedgerError, LedgerResult, SettlementOutcome, TransferSettlement};
pub use records::{
    CoinTransactionType, NewPaymentSession, SessionStatus, SettlementChannel, StoredBankTransaction,
    StoredCoinTransaction, StoredPaymentSession,
};
