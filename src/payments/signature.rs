// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Webhook authentication.
//!
//! The sender signs the raw request body with HMAC-SHA256 under the shared
//! `WEBHOOK_SECRET` and sends the hex digest as
//! `X-Webhook-Signature: sha256=<hex>` (the `sha256=` prefix is optional).

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing webhook signature")]
    Missing,

    #[error("Malformed webhook signature")]
    Malformed,

    #[error("Invalid webhook signature")]
    Mismatch,
}

/// Hex HMAC-SHA256 of `body` under `secret`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = new_mac(secret);
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature header value against the raw body.
///
/// The comparison runs in constant time.
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(SignatureError::Missing)?;
    let hex_digest = header.strip_prefix(SIGNATURE_PREFIX).unwrap_or(header);
    let expected = hex::decode(hex_digest).map_err(|_| SignatureError::Malformed)?;

    let mut mac = new_mac(secret);
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

fn new_mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"description":"NAPXU12345678","amount":50000}"#;

    #[test]
    fn valid_signature_is_accepted_with_or_without_prefix() {
        let digest = sign(SECRET, BODY);
        assert_eq!(verify(SECRET, BODY, Some(&format!("sha256={digest}"))), Ok(()));
        assert_eq!(verify(SECRET, BODY, Some(&digest)), Ok(()));
    }

    #[test]
    fn wrong_secret_or_body_is_rejected() {
        let digest = sign("other", BODY);
        assert_eq!(verify(SECRET, BODY, Some(&digest)), Err(SignatureError::Mismatch));

        let digest = sign(SECRET, BODY);
        assert_eq!(
            verify(SECRET, b"{\"amount\":1}", Some(&digest)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn missing_and_malformed_headers() {
        assert_eq!(verify(SECRET, BODY, None), Err(SignatureError::Missing));
        assert_eq!(verify(SECRET, BODY, Some("  ")), Err(SignatureError::Missing));
        assert_eq!(verify(SECRET, BODY, Some("sha256=zz")), Err(SignatureError::Malformed));
    }

    #[test]
    fn digest_is_lowercase_hex_sha256_length() {
        let digest = sign(SECRET, BODY);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
