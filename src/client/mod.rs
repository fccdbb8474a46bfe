// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Top-up Client
//!
//! HTTP client for the payment session endpoints plus the
//! [`watch::SessionWatcher`] polling loop that waits for a session to settle.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};

use crate::models::{CreateSessionRequest, PaymentSessionView};
use crate::payments::qr::QrProvider;

pub mod watch;

pub use watch::{SessionWatcher, WatchOutcome};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("response was invalid: {0}")]
    InvalidResponse(String),
}

/// Anything that can report the current state of a payment session.
pub trait SessionStatusSource: Send + Sync {
    fn session_status(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<PaymentSessionView, ClientError>> + Send;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Authenticated client for the top-up API.
#[derive(Debug, Clone)]
pub struct TopupClient {
    base_url: String,
    access_token: String,
    http: Client,
}

impl TopupClient {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }

    /// Open a payment session for a package.
    pub async fn create_session(
        &self,
        package_id: &str,
        provider: QrProvider,
    ) -> Result<PaymentSessionView, ClientError> {
        let url = self.url("/payments/sessions");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&CreateSessionRequest {
                package_id: package_id.to_string(),
                provider,
            })
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("POST {url} failed: {e}")))?;
        read_json(response).await
    }

    /// Fetch a payment session owned by the caller.
    pub async fn get_session(&self, session_id: &str) -> Result<PaymentSessionView, ClientError> {
        let url = self.url(&format!("/payments/sessions/{session_id}"));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ClientError::Request(format!("GET {url} failed: {e}")))?;
        read_json(response).await
    }
}

impl SessionStatusSource for TopupClient {
    async fn session_status(&self, session_id: &str) -> Result<PaymentSessionView, ClientError> {
        self.get_session(session_id).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_versioned_and_trimmed() {
        let client = TopupClient::new("http://localhost:8080/", "token").unwrap();
        assert_eq!(
            client.url("/payments/sessions/abc"),
            "http://localhost:8080/v1/payments/sessions/abc"
        );
    }
}
