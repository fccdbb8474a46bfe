// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! QR image URLs for bank transfers.
//!
//! Both providers render the QR server-side from a templated image URL; the
//! app only embeds the amount and the URL-encoded transfer content.

use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;
use utoipa::ToSchema;

use crate::config::BankAccount;

const VIETQR_IMAGE_BASE_URL: &str = "https://img.vietqr.io/image";
const VIETQR_TEMPLATE: &str = "compact2";
const MOMO_QR_BASE_URL: &str = "https://momosv3.apimienphi.com/api/QRCode";

/// Provider a payment QR is rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum QrProvider {
    /// VietQR transfer to the configured MB Bank account.
    #[default]
    #[serde(rename = "mbbank")]
    MbBank,
    /// MoMo wallet transfer to the configured phone number.
    #[serde(rename = "momo")]
    Momo,
}

impl std::fmt::Display for QrProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QrProvider::MbBank => write!(f, "mbbank"),
            QrProvider::Momo => write!(f, "momo"),
        }
    }
}

impl std::str::FromStr for QrProvider {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mbbank" => Ok(QrProvider::MbBank),
            "momo" => Ok(QrProvider::Momo),
            other => Err(QrError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QrError {
    #[error("MoMo payments are not configured")]
    MomoNotConfigured,

    #[error("Unknown QR provider: {0}")]
    UnknownProvider(String),
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// Build the QR image URL for a transfer of `amount_vnd` with the given memo.
pub fn qr_code_url(
    provider: QrProvider,
    account: &BankAccount,
    amount_vnd: u64,
    transfer_content: &str,
) -> Result<String, QrError> {
    match provider {
        QrProvider::MbBank => Ok(format!(
            "{VIETQR_IMAGE_BASE_URL}/{}-{}-{VIETQR_TEMPLATE}.png?amount={amount_vnd}&addInfo={}&accountName={}",
            account.bank_bin,
            account.account_no,
            encode(transfer_content),
            encode(&account.account_name),
        )),
        QrProvider::Momo => {
            let phone = account.momo_phone.as_deref().ok_or(QrError::MomoNotConfigured)?;
            Ok(format!(
                "{MOMO_QR_BASE_URL}?phone={}&amount={amount_vnd}&note={}",
                encode(phone),
                encode(transfer_content),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(momo_phone: Option<&str>) -> BankAccount {
        BankAccount {
            bank_bin: "970422".to_string(),
            account_no: "0123456789".to_string(),
            account_name: "NGUYEN VAN A".to_string(),
            momo_phone: momo_phone.map(str::to_string),
        }
    }

    #[test]
    fn vietqr_url_embeds_amount_and_encoded_content() {
        let url = qr_code_url(
            QrProvider::MbBank,
            &account(None),
            50_000,
            "NAPXU12345678 9a8b7c6d",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://img.vietqr.io/image/970422-0123456789-compact2.png?amount=50000&addInfo=NAPXU12345678+9a8b7c6d&accountName=NGUYEN+VAN+A"
        );
    }

    #[test]
    fn momo_url_requires_phone() {
        assert_eq!(
            qr_code_url(QrProvider::Momo, &account(None), 50_000, "NAPXU12345678"),
            Err(QrError::MomoNotConfigured)
        );

        let url = qr_code_url(QrProvider::Momo, &account(Some("0901234567")), 20_000, "NAPXU1 a&b")
            .unwrap();
        assert!(url.starts_with("https://momosv3.apimienphi.com/api/QRCode?phone=0901234567"));
        assert!(url.contains("amount=20000"));
        assert!(url.ends_with("note=NAPXU1+a%26b"));
    }

    #[test]
    fn provider_parses_from_cli_names() {
        assert_eq!("MBBank".parse::<QrProvider>(), Ok(QrProvider::MbBank));
        assert_eq!(" momo ".parse::<QrProvider>(), Ok(QrProvider::Momo));
        assert_eq!(
            "zalopay".parse::<QrProvider>(),
            Err(QrError::UnknownProvider("zalopay".to_string()))
        );
    }

    #[test]
    fn provider_serializes_as_lowercase_names() {
        assert_eq!(serde_json::to_string(&QrProvider::MbBank).unwrap(), "\"mbbank\"");
        assert_eq!(
            serde_json::from_str::<QrProvider>("\"momo\"").unwrap(),
            QrProvider::Momo
        );
        assert_eq!(QrProvider::default(), QrProvider::MbBank);
    }
}
