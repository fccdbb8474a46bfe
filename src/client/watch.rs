// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side wait for a payment session to settle.
//!
//! The watcher polls the session every 5 seconds and gives up after 10
//! minutes whatever the payment state. Giving up never touches the server:
//! a transfer arriving later is still credited, the client just does not
//! observe it.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionStatusSource;
use crate::storage::SessionStatus;

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default time after which the watcher stops waiting.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(600);

/// How a watch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The server reported the session completed.
    Completed { coins_added: u64 },
    /// The server reported the session expired.
    Expired,
    /// The deadline passed without a terminal status.
    TimedOut,
    /// The caller cancelled the watch.
    Cancelled,
}

/// Polls a session until it reaches a terminal state.
pub struct SessionWatcher<S> {
    source: S,
    poll_interval: Duration,
    deadline: Duration,
}

impl<S: SessionStatusSource> SessionWatcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_timing(mut self, poll_interval: Duration, deadline: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.deadline = deadline;
        self
    }

    /// Poll `session_id` until it completes, expires, times out, or `cancel`
    /// fires. Fetch errors are logged and polling continues.
    pub async fn watch(&self, session_id: &str, cancel: CancellationToken) -> WatchOutcome {
        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return cancelled(session_id),
                _ = &mut deadline => return timed_out(session_id),
                _ = ticker.tick() => {}
            }

            // A slow status call must not outlive cancellation or the deadline.
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return cancelled(session_id),
                _ = &mut deadline => return timed_out(session_id),
                result = self.source.session_status(session_id) => result,
            };

            match fetched {
                Ok(view) => match view.status {
                    SessionStatus::Completed => {
                        info!(
                            session_id = %session_id,
                            coins_added = view.coins_amount,
                            "Payment session completed"
                        );
                        return WatchOutcome::Completed {
                            coins_added: view.coins_amount,
                        };
                    }
                    SessionStatus::Expired => {
                        info!(session_id = %session_id, "Payment session expired");
                        return WatchOutcome::Expired;
                    }
                    SessionStatus::Pending => {
                        debug!(
                            session_id = %session_id,
                            seconds_remaining = view.seconds_remaining,
                            "Payment session still pending"
                        );
                    }
                },
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Failed to fetch session status");
                }
            }
        }
    }
}

fn cancelled(session_id: &str) -> WatchOutcome {
    info!(session_id = %session_id, "Session watch cancelled");
    WatchOutcome::Cancelled
}

fn timed_out(session_id: &str) -> WatchOutcome {
    info!(session_id = %session_id, "Session watch timed out");
    WatchOutcome::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::models::PaymentSessionView;
    use crate::payments::qr::QrProvider;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted responses, then repeats the last one.
    struct Scripted {
        responses: Mutex<VecDeque<Result<SessionStatus, String>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(responses: Vec<Result<SessionStatus, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn view(status: SessionStatus) -> PaymentSessionView {
        let now = Utc::now();
        PaymentSessionView {
            id: "session-1".to_string(),
            package_id: "pkg_50k".to_string(),
            amount_vnd: 50_000,
            coins_amount: 550,
            transfer_content: "NAPXU12345678 9a8b7c6d".to_string(),
            transaction_code: "NAPXU12345678".to_string(),
            qr_code_url: "https://img.vietqr.io/image/x.png".to_string(),
            provider: QrProvider::MbBank,
            status,
            created_at: now,
            expires_at: now + chrono::Duration::minutes(10),
            completed_at: None,
            seconds_remaining: 600,
        }
    }

    impl SessionStatusSource for Scripted {
        async fn session_status(&self, _session_id: &str) -> Result<PaymentSessionView, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut responses = self.responses.lock().unwrap();
                if responses.len() > 1 {
                    responses.pop_front()
                } else {
                    responses.front().cloned()
                }
            };
            match next {
                Some(Ok(status)) => Ok(view(status)),
                Some(Err(message)) => Err(ClientError::Request(message)),
                None => Err(ClientError::Request("no script".to_string())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn completes_when_server_reports_completed() {
        let source = Scripted::new(vec![
            Ok(SessionStatus::Pending),
            Ok(SessionStatus::Pending),
            Ok(SessionStatus::Completed),
        ]);
        let watcher = SessionWatcher::new(source);

        let started = tokio::time::Instant::now();
        let outcome = watcher.watch("session-1", CancellationToken::new()).await;

        assert_eq!(outcome, WatchOutcome::Completed { coins_added: 550 });
        assert_eq!(watcher.source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_do_not_stop_polling() {
        let source = Scripted::new(vec![
            Err("connection reset".to_string()),
            Err("timeout".to_string()),
            Ok(SessionStatus::Completed),
        ]);
        let watcher = SessionWatcher::new(source);

        let outcome = watcher.watch("session-1", CancellationToken::new()).await;
        assert_eq!(outcome, WatchOutcome::Completed { coins_added: 550 });
    }

    #[tokio::test(start_paused = true)]
    async fn expired_status_ends_watch() {
        let watcher = SessionWatcher::new(Scripted::new(vec![Ok(SessionStatus::Expired)]));
        let outcome = watcher.watch("session-1", CancellationToken::new()).await;
        assert_eq!(outcome, WatchOutcome::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_ten_minutes_of_pending() {
        let watcher = SessionWatcher::new(Scripted::new(vec![Ok(SessionStatus::Pending)]));

        let started = tokio::time::Instant::now();
        let outcome = watcher.watch("session-1", CancellationToken::new()).await;

        assert_eq!(outcome, WatchOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(600));
        assert!(watcher.source.calls.load(Ordering::SeqCst) >= 120);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_watch() {
        let watcher = SessionWatcher::new(Scripted::new(vec![Ok(SessionStatus::Pending)]))
            .with_timing(Duration::from_secs(5), Duration::from_secs(600));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            trigger.cancel();
        });

        let outcome = watcher.watch("session-1", cancel).await;
        assert_eq!(outcome, WatchOutcome::Cancelled);
        assert_eq!(watcher.source.calls.load(Ordering::SeqCst), 3);
    }

    /// A status call that never answers.
    struct Hanging;

    impl SessionStatusSource for Hanging {
        async fn session_status(&self, _session_id: &str) -> Result<PaymentSessionView, ClientError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_still_times_out() {
        let watcher = SessionWatcher::new(Hanging)
            .with_timing(Duration::from_secs(5), Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let outcome = watcher.watch("session-1", CancellationToken::new()).await;

        assert_eq!(outcome, WatchOutcome::TimedOut);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_is_cancellable() {
        let watcher = SessionWatcher::new(Hanging);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let outcome = watcher.watch("session-1", cancel).await;

        assert_eq!(outcome, WatchOutcome::Cancelled);
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }
}
