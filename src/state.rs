// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::AppConfig;
use crate::providers::MbBankClient;
use crate::storage::LedgerDatabase;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerDatabase>,
    pub config: Arc<AppConfig>,
    /// Present when the bank listing API is configured.
    pub bank_client: Option<Arc<MbBankClient>>,
}

impl AppState {
    pub fn new(ledger: Arc<LedgerDatabase>, config: Arc<AppConfig>) -> Self {
        Self {
            ledger,
            config,
            bank_client: None,
        }
    }

    pub fn with_bank_client(mut self, client: Arc<MbBankClient>) -> Self {
        self.bank_client = Some(client);
        self
    }
}
