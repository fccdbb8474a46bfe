// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Bank Transaction Poller
//!
//! Background task that periodically pulls recent transfers from the bank
//! listing API and settles them through the same reconciler as the webhook.
//! This catches transfers whose webhook never arrived.
//!
//! ## Strategy
//!
//! Every `poll_interval` (default 60 s) the poller:
//! 1. Lists recent transfers from the bank.
//! 2. Skips transfers whose reference is already recorded as credited.
//! 3. Reconciles the rest on their `NAPXU########` code. Memos in the
//!    deprecated `NAP XU <uuid>` form are counted and logged, never credited.
//! 4. Moves pending sessions past their expiry (plus grace) to `expired`.
//!
//! A transfer that cannot be credited stays in the bank listing, so it is
//! seen again on every sweep. The poller warns about it once and logs later
//! sightings at debug level until it drops out of the listing.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::payments::{code, reconcile, BankTransfer, Reconciliation};
use crate::providers::{BankTransactionSource, MbBankError};
use crate::storage::{LedgerDatabase, SettlementChannel, SettlementOutcome};

/// Counters for one polling sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncReport {
    /// Transfers returned by the bank.
    pub fetched: usize,
    /// Transfers that credited a wallet in this sweep.
    pub credited: usize,
    /// Transfers already credited earlier.
    pub already_processed: usize,
    /// Transfers with no creditable pending session.
    pub unmatched: usize,
    /// Transfers using the deprecated `NAP XU <uuid>` memo.
    pub legacy: usize,
    /// Transfers that hit a storage error.
    pub failed: usize,
    /// Pending sessions moved to `expired`.
    pub expired_sessions: usize,
}

/// Transfers already reported as not creditable.
#[derive(Debug, Default)]
pub struct ReportedTransfers(HashSet<String>);

impl ReportedTransfers {
    /// Record `key`, returning whether it was new.
    fn first_report(&mut self, key: &str) -> bool {
        self.0.insert(key.to_string())
    }

    /// Forget transfers that are no longer listed.
    fn retain_listed(&mut self, transfers: &[BankTransfer]) {
        let listed: HashSet<String> = transfers.iter().map(transfer_key).collect();
        self.0.retain(|key| listed.contains(key));
    }
}

/// Identity of a listed transfer: its provider id, else its memo.
fn transfer_key(transfer: &BankTransfer) -> String {
    transfer
        .provider_id
        .clone()
        .unwrap_or_else(|| transfer.description.clone())
}

/// Run one sweep against `source`.
///
/// Fails only when the bank listing itself fails; per-transfer storage errors
/// are counted in [`SyncReport::failed`].
pub async fn sync_once<S: BankTransactionSource>(
    ledger: &LedgerDatabase,
    source: &S,
    grace: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<SyncReport, MbBankError> {
    sync_reporting(ledger, source, grace, now, &mut ReportedTransfers::default()).await
}

/// [`sync_once`], warning only about uncreditable transfers not in `reported`.
pub async fn sync_reporting<S: BankTransactionSource>(
    ledger: &LedgerDatabase,
    source: &S,
    grace: chrono::Duration,
    now: DateTime<Utc>,
    reported: &mut ReportedTransfers,
) -> Result<SyncReport, MbBankError> {
    let transfers = source.recent_transfers().await?;
    let mut report = SyncReport {
        fetched: transfers.len(),
        ..SyncReport::default()
    };

    for transfer in &transfers {
        if let Some(provider_id) = transfer.provider_id.as_deref() {
            match ledger.get_bank_transaction(provider_id) {
                Ok(Some(_)) => {
                    report.already_processed += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(reference = %provider_id, error = %e, "Bank poller: idempotency lookup failed");
                    report.failed += 1;
                    continue;
                }
            }
        }

        let reconciliation = match reconcile(ledger, transfer, SettlementChannel::Polling, grace, now) {
            Ok(reconciliation) => reconciliation,
            Err(e) => {
                warn!(
                    provider_id = ?transfer.provider_id,
                    error = %e,
                    "Bank poller: failed to settle transfer"
                );
                report.failed += 1;
                continue;
            }
        };

        match &reconciliation {
            Reconciliation::NoCode => match code::extract_legacy_user_id(&transfer.description) {
                Some(user_id) => {
                    report.legacy += 1;
                    if reported.first_report(&transfer_key(transfer)) {
                        warn!(
                            user_id = %user_id,
                            provider_id = ?transfer.provider_id,
                            amount_vnd = transfer.amount_vnd,
                            "Bank poller: deprecated NAP XU memo not credited"
                        );
                    } else {
                        debug!(provider_id = ?transfer.provider_id, "Bank poller: deprecated memo still listed");
                    }
                }
                None => report.unmatched += 1,
            },
            Reconciliation::Settled {
                transaction_code,
                reference,
                outcome,
            } => match outcome {
                SettlementOutcome::Credited { .. } => report.credited += 1,
                SettlementOutcome::AlreadyProcessed { .. } => report.already_processed += 1,
                SettlementOutcome::SessionNotFound { .. }
                | SettlementOutcome::SessionExpired { .. }
                | SettlementOutcome::AmountMismatch { .. } => {
                    report.unmatched += 1;
                    if reported.first_report(&transfer_key(transfer)) {
                        warn!(
                            reference = %reference,
                            transaction_code = %transaction_code,
                            amount_vnd = transfer.amount_vnd,
                            outcome = %reconciliation.message(),
                            "Bank poller: transfer not credited"
                        );
                    } else {
                        debug!(
                            reference = %reference,
                            outcome = %reconciliation.message(),
                            "Bank poller: transfer still not credited"
                        );
                    }
                }
            },
        }
    }
    reported.retain_listed(&transfers);

    match ledger.expire_stale_sessions(now, grace) {
        Ok(expired) => report.expired_sessions = expired,
        Err(e) => warn!(error = %e, "Bank poller: failed to expire stale sessions"),
    }

    Ok(report)
}

/// Background poller settling bank transfers the webhook missed.
pub struct BankPoller<S> {
    ledger: Arc<LedgerDatabase>,
    source: Arc<S>,
    poll_interval: Duration,
    grace: chrono::Duration,
    reported: ReportedTransfers,
}

impl<S: BankTransactionSource> BankPoller<S> {
    pub fn new(
        ledger: Arc<LedgerDatabase>,
        source: Arc<S>,
        poll_interval: Duration,
        grace: chrono::Duration,
    ) -> Self {
        Self {
            ledger,
            source,
            poll_interval,
            grace,
            reported: ReportedTransfers::default(),
        }
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.poll_interval.as_secs(),
            "Bank transaction poller starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Bank transaction poller shutting down");
                return;
            }

            self.poll_step().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Bank transaction poller shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one polling sweep and log its counters.
    async fn poll_step(&mut self) {
        let swept = sync_reporting(
            &self.ledger,
            self.source.as_ref(),
            self.grace,
            Utc::now(),
            &mut self.reported,
        )
        .await;
        match swept {
            Ok(report) if report.credited > 0 || report.expired_sessions > 0 => {
                info!(
                    fetched = report.fetched,
                    credited = report.credited,
                    already_processed = report.already_processed,
                    unmatched = report.unmatched,
                    legacy = report.legacy,
                    failed = report.failed,
                    expired_sessions = report.expired_sessions,
                    "Bank poller: sweep complete"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Bank poller: failed to list transactions");
            }
        }
    }
}
