// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Coin Top-up Server - QR top-up reconciliation and coin wallet ledger
//!
//! Users buy in-app coins by scanning a bank or MoMo QR code. Each purchase
//! opens a payment session carrying a unique `NAPXU########` transaction
//! code; incoming bank transfers (pushed by webhook or pulled from the bank
//! listing API) are matched on that code and credited exactly once.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer token authentication (HS256 JWT)
//! - `bank_poller` - Scheduled pull of bank transactions
//! - `client` - Top-up API client and session watcher
//! - `payments` - Packages, transaction codes, QR payloads, reconciliation
//! - `providers` - Bank transaction listing clients
//! - `storage` - Coin ledger (redb)

pub mod api;
pub mod auth;
pub mod bank_poller;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod payments;
pub mod providers;
pub mod state;
pub mod storage;
