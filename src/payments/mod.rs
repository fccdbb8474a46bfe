// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Payments Module
//!
//! QR top-up flow: a user picks a coin package, a pending session with a
//! unique `NAPXU########` transaction code is persisted, and the QR asks the
//! payer to put that code in the transfer memo. Bank transfers reported by
//! the webhook or found by the poller are matched on the code and settled
//! against the ledger.
//!
//! ## Flow
//!
//! 1. [`sessions::open_session`]: package → code → QR URL → pending session
//! 2. [`payload`] / [`signature`]: authenticate and normalize bank payloads
//! 3. [`reconciler::reconcile`]: code match → atomic credit

pub mod code;
pub mod packages;
pub mod payload;
pub mod qr;
pub mod reconciler;
pub mod sessions;
pub mod signature;

pub use packages::CoinPackage;
pub use payload::{BankTransfer, PayloadError};
pub use qr::QrProvider;
pub use reconciler::{reconcile, Reconciliation};
pub use sessions::{open_session, SessionError};
