// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! MB Bank transaction listing integration for pull-based reconciliation.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::BankTransactionSource;
use crate::config::MbBankSettings;
use crate::payments::payload::{transaction_objects, BankTransfer};

const TRANSACTIONS_PATH: &str = "/transactions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum MbBankError {
    #[error("MB Bank configuration missing: {0}")]
    MissingConfig(String),

    #[error("MB Bank request failed: {0}")]
    Request(String),

    #[error("MB Bank response was invalid: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone)]
pub struct MbBankClient {
    api_base_url: String,
    api_key: String,
    http: Client,
}

impl MbBankClient {
    pub fn new(settings: &MbBankSettings) -> Result<Self, MbBankError> {
        if settings.api_key.trim().is_empty() {
            return Err(MbBankError::MissingConfig("MBBANK_API_KEY".to_string()));
        }

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MbBankError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            http,
        })
    }

    fn transactions_url(&self) -> String {
        format!("{}{}", self.api_base_url, TRANSACTIONS_PATH)
    }

    async fn get_json(&self, url: &str) -> Result<Value, MbBankError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| MbBankError::Request(format!("GET {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MbBankError::Request(format!(
                "GET {url} returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MbBankError::InvalidResponse(format!("GET {url} invalid JSON: {e}")))
    }
}

impl BankTransactionSource for MbBankClient {
    async fn recent_transfers(&self) -> Result<Vec<BankTransfer>, MbBankError> {
        let url = self.transactions_url();
        let body = self.get_json(&url).await?;
        let transfers = parse_listing(&body)?;
        debug!(count = transfers.len(), "Fetched MB Bank transactions");
        Ok(transfers)
    }
}

/// Convert a listing body into transfers, skipping malformed entries.
pub fn parse_listing(body: &Value) -> Result<Vec<BankTransfer>, MbBankError> {
    let objects =
        transaction_objects(body).map_err(|e| MbBankError::InvalidResponse(e.to_string()))?;

    let mut transfers = Vec::with_capacity(objects.len());
    for object in objects {
        match BankTransfer::from_object(object) {
            Ok(transfer) => transfers.push(transfer),
            Err(e) => warn!(error = %e, "Skipping malformed MB Bank transaction"),
        }
    }
    Ok(transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(api_key: &str) -> MbBankSettings {
        MbBankSettings {
            api_url: "https://bank.example/v1/".to_string(),
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn client_requires_api_key() {
        assert!(matches!(
            MbBankClient::new(&settings(" ")),
            Err(MbBankError::MissingConfig(_))
        ));
    }

    #[test]
    fn transactions_url_strips_trailing_slash() {
        let client = MbBankClient::new(&settings("key")).unwrap();
        assert_eq!(client.transactions_url(), "https://bank.example/v1/transactions");
    }

    #[test]
    fn listing_skips_malformed_entries() {
        let body = json!({"data": [
            {"transactionID": "FT1", "description": "NAPXU12345678 ab", "amount": "50000"},
            {"transactionID": "FT2", "amount": 1000},
            {"refNo": 77, "content": "NAP XU 3f4d6542-b8ce-4226-93d3-80d6f14d6db2", "amount": 20000}
        ]});
        let transfers = parse_listing(&body).unwrap();
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].provider_id.as_deref(), Some("FT1"));
        assert_eq!(transfers[1].provider_id.as_deref(), Some("77"));
    }

    #[test]
    fn listing_skips_non_object_entries() {
        let body = json!({"data": [
            null,
            {"transactionID": "FT1", "description": "NAPXU12345678 ab", "amount": 50000},
            "pending",
            {"transactionID": "FT2", "description": "NAPXU87654321 cd", "amount": 20000}
        ]});
        let transfers = parse_listing(&body).unwrap();
        let ids: Vec<_> = transfers.iter().filter_map(|t| t.provider_id.as_deref()).collect();
        assert_eq!(ids, ["FT1", "FT2"]);
    }

    #[test]
    fn listing_rejects_non_object_body() {
        assert!(matches!(
            parse_listing(&json!("maintenance")),
            Err(MbBankError::InvalidResponse(_))
        ));
    }
}
