// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer-content codes.
//!
//! A payer is asked to send a transfer whose memo reads
//! `NAPXU######## xxxxxxxx`: the transaction code (`NAPXU` + 8 digits) that
//! identifies the payment session, followed by a short hash of the user id.
//! Banks and aggregators mangle memos freely (case, spacing, extra text), so
//! extraction only looks for the code itself.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Prefix every transaction code starts with.
pub const CODE_PREFIX: &str = "NAPXU";

/// Number of digits following the prefix.
pub const CODE_DIGITS: usize = 8;

const CODE_MODULUS: u128 = 100_000_000;

/// Length of the hex user hash appended to the transfer content.
const USER_HASH_LEN: usize = 8;

/// `NAPXU` followed by a digit run; the run length is checked separately
/// because the regex crate has no lookahead.
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)NAPXU([0-9]+)").expect("code regex is valid")
});

/// Deprecated `NAP XU <uuid>` memo that carried a user id instead of a code.
static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)NAP\s+XU\s+([0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12})",
    )
    .expect("legacy regex is valid")
});

/// Code derived from the last eight digits of the millisecond timestamp.
pub fn timestamp_code(now: DateTime<Utc>) -> String {
    let digits = now.timestamp_millis().rem_euclid(CODE_MODULUS as i64);
    format!("{CODE_PREFIX}{digits:08}")
}

/// Code drawn from random UUID bits, used once the timestamp code collides.
pub fn random_code() -> String {
    let digits = uuid::Uuid::new_v4().as_u128() % CODE_MODULUS;
    format!("{CODE_PREFIX}{digits:08}")
}

/// First eight hex characters of SHA-256(user_id).
pub fn user_hash(user_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(user_id.as_bytes()));
    digest[..USER_HASH_LEN].to_string()
}

/// Memo the payer is asked to use for a session.
pub fn transfer_content(transaction_code: &str, user_id: &str) -> String {
    format!("{transaction_code} {}", user_hash(user_id))
}

/// Extract the first `NAPXU` + exactly 8 digits from free text.
///
/// Matching is case-insensitive and the result is normalized to upper case.
/// A ninth digit disqualifies that occurrence.
pub fn extract_code(text: &str) -> Option<String> {
    CODE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find(|digits| digits.as_str().len() == CODE_DIGITS)
        .map(|digits| format!("{CODE_PREFIX}{}", digits.as_str()))
}

/// User id embedded in a deprecated `NAP XU <uuid>` memo.
pub fn extract_legacy_user_id(text: &str) -> Option<String> {
    LEGACY_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}
