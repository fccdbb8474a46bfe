// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External bank integrations.

use std::future::Future;

use crate::payments::payload::BankTransfer;

pub mod mbbank;

pub use mbbank::{MbBankClient, MbBankError};

/// Source of recently received bank transfers for the poller.
pub trait BankTransactionSource: Send + Sync {
    /// Transfers currently reported by the bank, newest first or in any order.
    fn recent_transfers(&self) -> impl Future<Output = Result<Vec<BankTransfer>, MbBankError>> + Send;
}
