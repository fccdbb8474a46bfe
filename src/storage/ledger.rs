// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded coin ledger backed by redb (pure Rust, ACID).
//!
//! Every balance mutation runs inside a single redb write transaction, and
//! redb admits one writer at a time. The balance update, the coin
//! transaction row, the session transition and the bank transaction record
//! therefore commit together or not at all, and concurrent deliveries of the
//! same bank transfer are serialized against the idempotency record.
//!
//! ## Table Layout
//!
//! - `profiles`: user_id → total_coins
//! - `payment_sessions`: session_id → serialized StoredPaymentSession
//! - `session_code_index`: transaction_code → session_id (unique)
//! - `coin_transactions`: composite key (user_id|!seq) → serialized StoredCoinTransaction
//! - `mbbank_transactions`: bank reference → serialized StoredBankTransaction
//! - `ledger_state`: key → counter

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, Table, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use super::records::{
    CoinTransactionType, SessionStatus, SettlementChannel, StoredBankTransaction,
    StoredCoinTransaction, StoredPaymentSession,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Wallet balances: user_id → total_coins.
const PROFILES: TableDefinition<&str, u64> = TableDefinition::new("profiles");

/// Primary session table: session_id → JSON bytes.
const PAYMENT_SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("payment_sessions");

/// Unique index: transaction_code → session_id.
const SESSION_CODE_INDEX: TableDefinition<&str, &str> = TableDefinition::new("session_code_index");

/// Coin ledger. Key format: `user_id|!seq_be` for newest-first range scans.
const COIN_TRANSACTIONS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("coin_transactions");

/// Credited bank transfers: reference → JSON bytes.
const BANK_TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("mbbank_transactions");

/// Ledger counters.
const LEDGER_STATE: TableDefinition<&str, u64> = TableDefinition::new("ledger_state");

const COIN_TX_SEQ_KEY: &str = "coin_tx_seq";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("failed to create data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction code already in use: {0}")]
    CodeConflict(String),

    #[error("insufficient coins: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Settlement Types
// =============================================================================

/// A bank transfer to settle against the pending session owning its code.
#[derive(Debug, Clone)]
pub struct TransferSettlement<'a> {
    /// Idempotency key: provider transaction id, or the transaction code.
    pub reference: &'a str,
    /// Normalized `NAPXU########` code.
    pub transaction_code: &'a str,
    /// Received amount in VND.
    pub amount_vnd: u64,
    pub channel: SettlementChannel,
    pub now: DateTime<Utc>,
    /// How long after `expires_at` a session stays creditable.
    pub grace: Duration,
}

/// Result of a settlement attempt. Only `Credited` and `SessionExpired`
/// write anything.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    Credited {
        session: StoredPaymentSession,
        coin_transaction: StoredCoinTransaction,
    },
    AlreadyProcessed {
        record: StoredBankTransaction,
    },
    SessionNotFound {
        /// Non-pending session holding the code, for diagnostics.
        existing: Option<StoredPaymentSession>,
    },
    SessionExpired {
        session: StoredPaymentSession,
    },
    AmountMismatch {
        session: StoredPaymentSession,
        expected: u64,
        received: u64,
    },
}

impl SettlementOutcome {
    fn is_mutating(&self) -> bool {
        matches!(
            self,
            SettlementOutcome::Credited { .. } | SettlementOutcome::SessionExpired { .. }
        )
    }
}

// =============================================================================
// Key Helpers
// =============================================================================

/// Build a composite key for the coin_transactions table.
///
/// Format: `user_id | inverted_seq_be_bytes`. The inverted sequence makes a
/// forward scan return the newest entry first.
fn make_coin_tx_key(user_id: &str, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(user_id.len() + 1 + 8);
    key.extend_from_slice(user_id.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!seq).to_be_bytes());
    key
}

fn make_prefix(user_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.len() + 1);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Upper bound for a prefix scan: the prefix followed by 0xFF bytes.
fn make_prefix_end(user_id: &str) -> Vec<u8> {
    let mut end = make_prefix(user_id);
    end.extend_from_slice(&[0xFF; 9]);
    end
}

fn get_json<T, R>(table: &R, key: &str) -> LedgerResult<Option<T>>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    key: &str,
    value: &T,
) -> LedgerResult<()> {
    let json = serde_json::to_vec(value)?;
    table.insert(key, json.as_slice())?;
    Ok(())
}

fn coins_as_delta(coins: u64) -> LedgerResult<i64> {
    i64::try_from(coins).map_err(|_| LedgerError::InvalidAmount(format!("{coins} coins")))
}

// =============================================================================
// LedgerDatabase
// =============================================================================

/// Embedded ACID coin ledger and payment session store.
pub struct LedgerDatabase {
    db: Database,
}

impl LedgerDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROFILES)?;
            let _ = write_txn.open_table(PAYMENT_SESSIONS)?;
            let _ = write_txn.open_table(SESSION_CODE_INDEX)?;
            let _ = write_txn.open_table(COIN_TRANSACTIONS)?;
            let _ = write_txn.open_table(BANK_TRANSACTIONS)?;
            let _ = write_txn.open_table(LEDGER_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Verify the database answers a read transaction.
    pub fn health_check(&self) -> LedgerResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(PROFILES)?;
        Ok(())
    }

    // =========================================================================
    // Payment sessions
    // =========================================================================

    /// Persist a new session and claim its transaction code.
    ///
    /// Fails with [`LedgerError::CodeConflict`] if any session, in any state,
    /// already holds the code.
    pub fn insert_session(&self, session: &StoredPaymentSession) -> LedgerResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut index = write_txn.open_table(SESSION_CODE_INDEX)?;
            if index.get(session.transaction_code.as_str())?.is_some() {
                return Err(LedgerError::CodeConflict(session.transaction_code.clone()));
            }
            index.insert(session.transaction_code.as_str(), session.id.as_str())?;

            let mut sessions = write_txn.open_table(PAYMENT_SESSIONS)?;
            put_json(&mut sessions, &session.id, session)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a session by id.
    pub fn get_session(&self, session_id: &str) -> LedgerResult<Option<StoredPaymentSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_SESSIONS)?;
        get_json(&table, session_id)
    }

    /// All sessions owned by a user, newest first.
    pub fn list_sessions_for_user(&self, user_id: &str) -> LedgerResult<Vec<StoredPaymentSession>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENT_SESSIONS)?;

        let mut sessions = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let session: StoredPaymentSession = serde_json::from_slice(value.value())?;
            if session.user_id == user_id {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    /// Move every pending session past `expires_at + grace` to `expired`.
    ///
    /// Returns the number of sessions transitioned.
    pub fn expire_stale_sessions(&self, now: DateTime<Utc>, grace: Duration) -> LedgerResult<usize> {
        let write_txn = self.db.begin_write()?;
        let expired = {
            let mut table = write_txn.open_table(PAYMENT_SESSIONS)?;

            let mut stale = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let session: StoredPaymentSession = serde_json::from_slice(value.value())?;
                if session.is_stale(now, grace) {
                    stale.push(session);
                }
            }

            for session in &mut stale {
                session.status = SessionStatus::Expired;
                put_json(&mut table, &session.id, session)?;
            }
            stale.len()
        };
        write_txn.commit()?;
        Ok(expired)
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Settle a bank transfer against the pending session owning its code.
    ///
    /// Runs in one write transaction: the idempotency check, the session
    /// checks, the wallet credit, the coin transaction row, the session
    /// completion and the bank transaction record either all commit or none
    /// do.
    pub fn settle_transfer(&self, settlement: &TransferSettlement<'_>) -> LedgerResult<SettlementOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = Self::settle_in(&write_txn, settlement)?;
        if outcome.is_mutating() {
            write_txn.commit()?;
        } else {
            write_txn.abort()?;
        }
        Ok(outcome)
    }

    fn settle_in(
        txn: &WriteTransaction,
        settlement: &TransferSettlement<'_>,
    ) -> LedgerResult<SettlementOutcome> {
        let mut bank = txn.open_table(BANK_TRANSACTIONS)?;
        if let Some(record) = get_json::<StoredBankTransaction, _>(&bank, settlement.reference)? {
            return Ok(SettlementOutcome::AlreadyProcessed { record });
        }

        let session_id = {
            let index = txn.open_table(SESSION_CODE_INDEX)?;
            let id = index
                .get(settlement.transaction_code)?
                .map(|v| v.value().to_string());
            id
        };
        let Some(session_id) = session_id else {
            return Ok(SettlementOutcome::SessionNotFound { existing: None });
        };

        let mut sessions = txn.open_table(PAYMENT_SESSIONS)?;
        let Some(mut session) = get_json::<StoredPaymentSession, _>(&sessions, &session_id)? else {
            return Ok(SettlementOutcome::SessionNotFound { existing: None });
        };

        if session.status.is_terminal() {
            return Ok(SettlementOutcome::SessionNotFound {
                existing: Some(session),
            });
        }

        if session.is_stale(settlement.now, settlement.grace) {
            session.status = SessionStatus::Expired;
            put_json(&mut sessions, &session.id, &session)?;
            return Ok(SettlementOutcome::SessionExpired { session });
        }

        if settlement.amount_vnd < session.amount_vnd {
            let expected = session.amount_vnd;
            return Ok(SettlementOutcome::AmountMismatch {
                session,
                expected,
                received: settlement.amount_vnd,
            });
        }

        let coins = session.coins_amount;
        let mut profiles = txn.open_table(PROFILES)?;
        let balance = profiles
            .get(session.user_id.as_str())?
            .map(|v| v.value())
            .unwrap_or(0);
        let new_balance = balance
            .checked_add(coins)
            .ok_or_else(|| LedgerError::InvalidAmount(format!("balance overflow for {}", session.user_id)))?;
        profiles.insert(session.user_id.as_str(), new_balance)?;

        let coin_transaction = StoredCoinTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: session.user_id.clone(),
            transaction_type: CoinTransactionType::Purchase,
            amount: coins_as_delta(coins)?,
            description: format!(
                "Top-up {} VND ({} coins)",
                session.amount_vnd, coins
            ),
            reference_id: Some(settlement.reference.to_string()),
            balance_after: new_balance,
            created_at: settlement.now,
        };
        let mut state = txn.open_table(LEDGER_STATE)?;
        let mut coin_txs = txn.open_table(COIN_TRANSACTIONS)?;
        Self::append_coin_transaction(&mut state, &mut coin_txs, &coin_transaction)?;

        session.status = SessionStatus::Completed;
        session.completed_at = Some(settlement.now);
        session.bank_reference = Some(settlement.reference.to_string());
        put_json(&mut sessions, &session.id, &session)?;

        let record = StoredBankTransaction {
            transaction_id: settlement.reference.to_string(),
            user_id: session.user_id.clone(),
            session_id: session.id.clone(),
            amount_vnd: settlement.amount_vnd,
            coins_added: coins,
            channel: settlement.channel,
            processed_at: settlement.now,
        };
        put_json(&mut bank, settlement.reference, &record)?;

        Ok(SettlementOutcome::Credited {
            session,
            coin_transaction,
        })
    }

    fn append_coin_transaction(
        state: &mut Table<'_, &'static str, u64>,
        coin_txs: &mut Table<'_, &'static [u8], &'static [u8]>,
        entry: &StoredCoinTransaction,
    ) -> LedgerResult<()> {
        let seq = state.get(COIN_TX_SEQ_KEY)?.map(|v| v.value()).unwrap_or(0) + 1;
        state.insert(COIN_TX_SEQ_KEY, seq)?;

        let key = make_coin_tx_key(&entry.user_id, seq);
        let json = serde_json::to_vec(entry)?;
        coin_txs.insert(key.as_slice(), json.as_slice())?;
        Ok(())
    }

    /// Look up a credited bank transaction by reference.
    pub fn get_bank_transaction(&self, reference: &str) -> LedgerResult<Option<StoredBankTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BANK_TRANSACTIONS)?;
        get_json(&table, reference)
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    /// Current wallet balance (0 for users never credited).
    pub fn balance(&self, user_id: &str) -> LedgerResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROFILES)?;
        let balance = table.get(user_id)?.map(|v| v.value()).unwrap_or(0);
        Ok(balance)
    }

    /// Debit coins if, and only if, the balance covers them.
    pub fn spend(
        &self,
        user_id: &str,
        amount: u64,
        description: &str,
        reference_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> LedgerResult<StoredCoinTransaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount("spend amount must be positive".to_string()));
        }
        let delta = coins_as_delta(amount)?;

        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut profiles = write_txn.open_table(PROFILES)?;
            let balance = profiles.get(user_id)?.map(|v| v.value()).unwrap_or(0);
            if balance < amount {
                return Err(LedgerError::InsufficientFunds {
                    balance,
                    requested: amount,
                });
            }
            let new_balance = balance - amount;
            profiles.insert(user_id, new_balance)?;

            let entry = StoredCoinTransaction {
                id: uuid::Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                transaction_type: CoinTransactionType::Spend,
                amount: -delta,
                description: description.to_string(),
                reference_id: reference_id.map(str::to_string),
                balance_after: new_balance,
                created_at: now,
            };
            let mut state = write_txn.open_table(LEDGER_STATE)?;
            let mut coin_txs = write_txn.open_table(COIN_TRANSACTIONS)?;
            Self::append_coin_transaction(&mut state, &mut coin_txs, &entry)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Most recent coin transactions for a user, newest first.
    pub fn list_coin_transactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<StoredCoinTransaction>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COIN_TRANSACTIONS)?;

        let prefix = make_prefix(user_id);
        let prefix_end = make_prefix_end(user_id);

        let mut results = Vec::with_capacity(limit.min(256));
        for entry in table.range(prefix.as_slice()..prefix_end.as_slice())? {
            if results.len() >= limit {
                break;
            }
            let (_, value) = entry?;
            results.push(serde_json::from_slice(value.value())?);
        }
        Ok(results)
    }

    /// Sum of every coin transaction recorded for a user.
    ///
    /// Equals [`LedgerDatabase::balance`] for a consistent ledger.
    pub fn ledger_total(&self, user_id: &str) -> LedgerResult<i64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COIN_TRANSACTIONS)?;

        let prefix = make_prefix(user_id);
        let prefix_end = make_prefix_end(user_id);

        let mut total = 0i64;
        for entry in table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, value) = entry?;
            let tx: StoredCoinTransaction = serde_json::from_slice(value.value())?;
            total = total.saturating_add(tx.amount);
        }
        Ok(total)
    }
}

// =============================================================================
// Tests
// =============================================================================
