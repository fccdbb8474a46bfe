// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Opening payment sessions.
//!
//! A session is persisted before its QR is ever shown; if the write fails the
//! caller gets an error instead of a QR that could never be reconciled.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{
    code,
    packages,
    qr::{self, QrError, QrProvider},
};
use crate::config::AppConfig;
use crate::storage::{LedgerDatabase, LedgerError, NewPaymentSession, StoredPaymentSession};

/// Transaction code draws before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("could not allocate a unique transaction code after {0} attempts")]
    CodeExhausted(usize),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Create and persist a pending session for `package_id`.
pub fn open_session(
    ledger: &LedgerDatabase,
    config: &AppConfig,
    user_id: &str,
    package_id: &str,
    provider: QrProvider,
    now: DateTime<Utc>,
) -> Result<StoredPaymentSession, SessionError> {
    let package =
        packages::find(package_id).ok_or_else(|| SessionError::UnknownPackage(package_id.to_string()))?;

    for attempt in 0..MAX_CODE_ATTEMPTS {
        let transaction_code = if attempt == 0 {
            code::timestamp_code(now)
        } else {
            code::random_code()
        };
        let transfer_content = code::transfer_content(&transaction_code, user_id);
        let qr_code_url = qr::qr_code_url(
            provider,
            &config.bank_account,
            package.price_vnd,
            &transfer_content,
        )?;

        let session = StoredPaymentSession::new_pending(
            NewPaymentSession {
                user_id: user_id.to_string(),
                package_id: package.id.to_string(),
                amount_vnd: package.price_vnd,
                coins_amount: package.total_coins(),
                transfer_content,
                transaction_code,
                qr_code_url,
                provider,
            },
            now,
            config.session_ttl,
        );

        match ledger.insert_session(&session) {
            Ok(()) => {
                info!(
                    session_id = %session.id,
                    user_id = %user_id,
                    package_id = %package.id,
                    transaction_code = %session.transaction_code,
                    provider = %provider,
                    "Payment session opened"
                );
                return Ok(session);
            }
            Err(LedgerError::CodeConflict(code)) => {
                debug!(transaction_code = %code, attempt, "Transaction code taken, drawing another");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SessionError::CodeExhausted(MAX_CODE_ATTEMPTS))
}

/// Seconds a session still accepts payment at `now`; zero once it is not
/// pending.
pub fn seconds_remaining(session: &StoredPaymentSession, now: DateTime<Utc>) -> u64 {
    if session.status.is_terminal() {
        return 0;
    }
    u64::try_from((session.expires_at - now).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SessionStatus;
    use crate::state::test_support::test_config;
    use chrono::Duration;

    fn temp_ledger() -> (LedgerDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = LedgerDatabase::open(&dir.path().join("ledger.redb")).unwrap();
        (ledger, dir)
    }

    #[test]
    fn opens_pending_session_for_package() {
        let (ledger, _dir) = temp_ledger();
        let now = Utc::now();
        let session =
            open_session(&ledger, &test_config(), "user-1", "pkg_50k", QrProvider::MbBank, now).unwrap();

        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.amount_vnd, 50_000);
        assert_eq!(session.coins_amount, 550);
        assert_eq!(session.transaction_code, code::timestamp_code(now));
        assert_eq!(
            session.transfer_content,
            format!("{} {}", session.transaction_code, code::user_hash("user-1"))
        );
        assert!(session.qr_code_url.contains("amount=50000"));
        assert_eq!(session.expires_at - session.created_at, Duration::minutes(10));
        assert_eq!(ledger.get_session(&session.id).unwrap(), Some(session));
    }

    #[test]
    fn colliding_timestamp_code_falls_back_to_random() {
        let (ledger, _dir) = temp_ledger();
        let now = Utc::now();
        let config = test_config();
        let first = open_session(&ledger, &config, "user-1", "pkg_10k", QrProvider::MbBank, now).unwrap();
        let second = open_session(&ledger, &config, "user-2", "pkg_10k", QrProvider::MbBank, now).unwrap();

        assert_ne!(first.transaction_code, second.transaction_code);
        assert!(code::extract_code(&second.transaction_code).is_some());
    }

    #[test]
    fn unknown_package_and_missing_momo_are_errors() {
        let (ledger, _dir) = temp_ledger();
        let now = Utc::now();
        let config = test_config();

        assert!(matches!(
            open_session(&ledger, &config, "user-1", "pkg_nope", QrProvider::MbBank, now),
            Err(SessionError::UnknownPackage(_))
        ));
        assert!(matches!(
            open_session(&ledger, &config, "user-1", "pkg_10k", QrProvider::Momo, now),
            Err(SessionError::Qr(QrError::MomoNotConfigured))
        ));
        assert!(ledger.list_sessions_for_user("user-1").unwrap().is_empty());
    }

    #[test]
    fn seconds_remaining_counts_down_to_zero() {
        let (ledger, _dir) = temp_ledger();
        let now = Utc::now();
        let mut session =
            open_session(&ledger, &test_config(), "user-1", "pkg_10k", QrProvider::MbBank, now).unwrap();

        assert_eq!(seconds_remaining(&session, now), 600);
        assert_eq!(seconds_remaining(&session, now + Duration::seconds(590)), 10);
        assert_eq!(seconds_remaining(&session, now + Duration::seconds(700)), 0);

        session.status = SessionStatus::Completed;
        assert_eq!(seconds_remaining(&session, now), 0);
    }
}
