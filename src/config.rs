// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`AppConfig`] loaded once at startup. Required values are validated before
//! the server binds, so a missing secret fails the process instead of the
//! first webhook.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the ledger database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `AUTH_JWT_SECRET` | HS256 secret for user access tokens | Required |
//! | `AUTH_JWT_AUDIENCE` | Expected JWT audience claim | `authenticated` |
//! | `WEBHOOK_SECRET` | HMAC-SHA256 secret for bank webhooks | Required |
//! | `BANK_BIN` | Receiving bank BIN for VietQR | `970422` (MB Bank) |
//! | `BANK_ACCOUNT_NO` | Receiving account number | Required |
//! | `BANK_ACCOUNT_NAME` | Account holder shown on the QR | empty |
//! | `MOMO_PHONE` | MoMo wallet phone for MoMo QR codes | Optional |
//! | `SESSION_TTL_SECS` | Payment session lifetime, 1 to 86400 | `600` |
//! | `LATE_PAYMENT_GRACE_SECS` | Extra time a session stays creditable, at most 30 days | `0` |
//! | `MBBANK_API_URL` | Bank transaction listing API | `https://api.mbbank.com.vn/v1` |
//! | `MBBANK_API_KEY` | Bearer token for the listing API | Optional (poller off) |
//! | `BANK_POLL_INTERVAL_SECS` | Poller sweep period | `60` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Builds with the `dev` feature accept missing secrets.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the ledger data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const AUTH_JWT_SECRET_ENV: &str = "AUTH_JWT_SECRET";
pub const AUTH_JWT_AUDIENCE_ENV: &str = "AUTH_JWT_AUDIENCE";
pub const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";
pub const BANK_BIN_ENV: &str = "BANK_BIN";
pub const BANK_ACCOUNT_NO_ENV: &str = "BANK_ACCOUNT_NO";
pub const BANK_ACCOUNT_NAME_ENV: &str = "BANK_ACCOUNT_NAME";
pub const MOMO_PHONE_ENV: &str = "MOMO_PHONE";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const LATE_PAYMENT_GRACE_ENV: &str = "LATE_PAYMENT_GRACE_SECS";
pub const MBBANK_API_URL_ENV: &str = "MBBANK_API_URL";
pub const MBBANK_API_KEY_ENV: &str = "MBBANK_API_KEY";
pub const BANK_POLL_INTERVAL_ENV: &str = "BANK_POLL_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default data directory (mounted volume in the container image).
pub const DEFAULT_DATA_DIR: &str = "/data";
/// MB Bank's BIN in the VietQR registry.
pub const DEFAULT_BANK_BIN: &str = "970422";
pub const DEFAULT_MBBANK_API_URL: &str = "https://api.mbbank.com.vn/v1";
pub const DEFAULT_AUDIENCE: &str = "authenticated";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;
pub const DEFAULT_BANK_POLL_INTERVAL_SECS: u64 = 60;
/// Longest session lifetime accepted from the environment (one day).
pub const MAX_SESSION_TTL_SECS: u64 = 86_400;
/// Longest late-payment grace accepted from the environment (30 days).
pub const MAX_LATE_PAYMENT_GRACE_SECS: u64 = 30 * 86_400;

/// File name of the ledger database inside `DATA_DIR`.
pub const LEDGER_FILE_NAME: &str = "ledger.redb";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// JWT verification settings for user access tokens.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub audience: String,
}

/// Receiving account rendered into QR payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankAccount {
    pub bank_bin: String,
    pub account_no: String,
    pub account_name: String,
    pub momo_phone: Option<String>,
}

/// Credentials for the pull-based bank transaction listing.
#[derive(Debug, Clone)]
pub struct MbBankSettings {
    pub api_url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub auth: AuthSettings,
    pub webhook_secret: Option<String>,
    pub bank_account: BankAccount,
    pub session_ttl: chrono::Duration,
    pub late_payment_grace: chrono::Duration,
    pub mbbank: Option<MbBankSettings>,
    pub bank_poll_interval: Duration,
    pub tls: Option<TlsSettings>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, 8080u16)?;
        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let auth = AuthSettings {
            jwt_secret: required(get(AUTH_JWT_SECRET_ENV), AUTH_JWT_SECRET_ENV)?,
            audience: get(AUTH_JWT_AUDIENCE_ENV).unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
        };
        let webhook_secret = required(get(WEBHOOK_SECRET_ENV), WEBHOOK_SECRET_ENV)?;

        let bank_account = BankAccount {
            bank_bin: get(BANK_BIN_ENV).unwrap_or_else(|| DEFAULT_BANK_BIN.to_string()),
            account_no: required(get(BANK_ACCOUNT_NO_ENV), BANK_ACCOUNT_NO_ENV)?
                .unwrap_or_default(),
            account_name: get(BANK_ACCOUNT_NAME_ENV).unwrap_or_default(),
            momo_phone: get(MOMO_PHONE_ENV),
        };

        let session_ttl_secs = parse_or(get(SESSION_TTL_ENV), SESSION_TTL_ENV, DEFAULT_SESSION_TTL_SECS)?;
        let session_ttl = bounded_secs(session_ttl_secs, 1..=MAX_SESSION_TTL_SECS, SESSION_TTL_ENV)?;
        let grace_secs = parse_or(get(LATE_PAYMENT_GRACE_ENV), LATE_PAYMENT_GRACE_ENV, 0u64)?;
        let late_payment_grace = bounded_secs(grace_secs, 0..=MAX_LATE_PAYMENT_GRACE_SECS, LATE_PAYMENT_GRACE_ENV)?;

        let mbbank = get(MBBANK_API_KEY_ENV).map(|api_key| MbBankSettings {
            api_url: get(MBBANK_API_URL_ENV).unwrap_or_else(|| DEFAULT_MBBANK_API_URL.to_string()),
            api_key,
        });
        let poll_secs = parse_or(
            get(BANK_POLL_INTERVAL_ENV),
            BANK_POLL_INTERVAL_ENV,
            DEFAULT_BANK_POLL_INTERVAL_SECS,
        )?
        .max(1);

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsSettings {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            host,
            port,
            data_dir,
            auth,
            webhook_secret,
            bank_account,
            session_ttl,
            late_payment_grace,
            mbbank,
            bank_poll_interval: Duration::from_secs(poll_secs),
            tls,
        })
    }

    /// Path of the ledger database file.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE_NAME)
    }
}

/// A secret or identifier that production builds cannot run without.
fn required(value: Option<String>, name: &'static str) -> Result<Option<String>, ConfigError> {
    match value {
        Some(value) => Ok(Some(value)),
        None if cfg!(feature = "dev") => Ok(None),
        None => Err(ConfigError::Missing(name)),
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

/// Seconds as a `chrono::Duration`, rejected outside `range`.
fn bounded_secs(
    value: u64,
    range: std::ops::RangeInclusive<u64>,
    name: &'static str,
) -> Result<chrono::Duration, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name,
        value: value.to_string(),
    };
    if !range.contains(&value) {
        return Err(invalid());
    }
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(invalid)
}
