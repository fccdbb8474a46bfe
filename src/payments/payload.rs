// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Normalization of bank transaction payloads.
//!
//! Aggregators post (and the bank listing API returns) one of four shapes:
//!
//! ```text
//! {"data": {...}}      {"data": [{...}, ...]}
//! {...}                [{...}, ...]
//! ```
//!
//! Field names also vary, so lookups go through ordered fallback keys.

use serde_json::{Map, Value};

/// Keys that may carry the provider transaction id, in priority order.
const PROVIDER_ID_KEYS: &[&str] = &[
    "id",
    "transaction_id",
    "transactionID",
    "tid",
    "reference",
    "refNo",
];

/// Keys that may carry the transfer memo, in priority order.
const DESCRIPTION_KEYS: &[&str] = &["description", "content"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("Empty transaction list")]
    EmptyList,

    #[error("Transaction payload must be a JSON object")]
    NotAnObject,

    #[error("Missing transaction description")]
    MissingDescription,

    #[error("Missing or invalid transaction amount")]
    InvalidAmount,
}

/// A bank transfer as reported by the bank or an aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTransfer {
    /// Transfer memo.
    pub description: String,
    /// Absolute amount in whole VND.
    pub amount_vnd: u64,
    /// Provider transaction id, when the payload carried one.
    pub provider_id: Option<String>,
}

impl BankTransfer {
    /// Read a transfer out of a single transaction object.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, PayloadError> {
        let description = DESCRIPTION_KEYS
            .iter()
            .filter_map(|key| object.get(*key))
            .find_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(PayloadError::MissingDescription)?
            .to_string();

        let amount_vnd = object
            .get("amount")
            .and_then(parse_amount)
            .ok_or(PayloadError::InvalidAmount)?;

        let provider_id = PROVIDER_ID_KEYS
            .iter()
            .filter_map(|key| object.get(*key))
            .find_map(id_as_string);

        Ok(Self {
            description,
            amount_vnd,
            provider_id,
        })
    }
}

/// Parse a raw webhook body and pick its transaction.
///
/// For array shapes only the first object element is considered.
pub fn parse_webhook_body(body: &[u8]) -> Result<BankTransfer, PayloadError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
    let first = transaction_objects(&value)?
        .into_iter()
        .next()
        .ok_or(PayloadError::EmptyList)?;
    BankTransfer::from_object(first)
}

/// Every transaction object in a payload, in order.
///
/// Non-object array elements are skipped. An array holding nothing but
/// non-objects is rejected.
pub fn transaction_objects(value: &Value) -> Result<Vec<&Map<String, Value>>, PayloadError> {
    let inner = match value {
        Value::Object(object) => object.get("data").unwrap_or(value),
        other => other,
    };

    match inner {
        Value::Object(object) => Ok(vec![object]),
        Value::Array(items) => {
            let objects: Vec<_> = items.iter().filter_map(Value::as_object).collect();
            if objects.is_empty() && !items.is_empty() {
                return Err(PayloadError::NotAnObject);
            }
            Ok(objects)
        }
        _ => Err(PayloadError::NotAnObject),
    }
}

/// Number or numeric string; absolute value truncated to whole VND.
fn parse_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                Some(n.unsigned_abs())
            } else if let Some(n) = number.as_u64() {
                Some(n)
            } else {
                number.as_f64().and_then(float_to_vnd)
            }
        }
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(n) = raw.parse::<i64>() {
                Some(n.unsigned_abs())
            } else {
                raw.parse::<f64>().ok().and_then(float_to_vnd)
            }
        }
        _ => None,
    }
}

fn float_to_vnd(value: f64) -> Option<u64> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.abs().trunc();
    if truncated > u64::MAX as f64 {
        return None;
    }
    Some(truncated as u64)
}

fn id_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<BankTransfer, PayloadError> {
        parse_webhook_body(value.to_string().as_bytes())
    }

    #[test]
    fn accepts_all_four_shapes() {
        let tx = json!({"description": "NAPXU12345678 9a8b7c6d", "amount": 50000, "id": "FT1"});
        let expected = BankTransfer {
            description: "NAPXU12345678 9a8b7c6d".to_string(),
            amount_vnd: 50_000,
            provider_id: Some("FT1".to_string()),
        };

        assert_eq!(parse(json!({"data": tx.clone()})).unwrap(), expected);
        assert_eq!(parse(json!({"data": [tx.clone()]})).unwrap(), expected);
        assert_eq!(parse(tx.clone()).unwrap(), expected);
        assert_eq!(parse(json!([tx])).unwrap(), expected);
    }

    #[test]
    fn first_array_element_wins() {
        let body = json!([
            {"description": "first", "amount": 1000},
            {"description": "second", "amount": 2000}
        ]);
        assert_eq!(parse(body).unwrap().description, "first");
    }

    #[test]
    fn empty_list_is_rejected() {
        assert_eq!(parse(json!([])), Err(PayloadError::EmptyList));
        assert_eq!(parse(json!({"data": []})), Err(PayloadError::EmptyList));
    }

    #[test]
    fn content_is_description_fallback() {
        let transfer = parse(json!({"content": "NAPXU12345678", "amount": "20000"})).unwrap();
        assert_eq!(transfer.description, "NAPXU12345678");
        assert_eq!(transfer.amount_vnd, 20_000);
        assert!(transfer.provider_id.is_none());
    }

    #[test]
    fn amount_is_absolute_and_truncated() {
        assert_eq!(parse(json!({"description": "x", "amount": -50000})).unwrap().amount_vnd, 50_000);
        assert_eq!(parse(json!({"description": "x", "amount": 49999.9})).unwrap().amount_vnd, 49_999);
        assert_eq!(parse(json!({"description": "x", "amount": " -120.5 "})).unwrap().amount_vnd, 120);
    }

    #[test]
    fn missing_fields_are_reported() {
        assert_eq!(parse(json!({"amount": 1})), Err(PayloadError::MissingDescription));
        assert_eq!(parse(json!({"description": "x"})), Err(PayloadError::InvalidAmount));
        assert_eq!(
            parse(json!({"description": "x", "amount": "lots"})),
            Err(PayloadError::InvalidAmount)
        );
        assert_eq!(parse(json!("text")), Err(PayloadError::NotAnObject));
        assert!(matches!(
            parse_webhook_body(b"not json"),
            Err(PayloadError::InvalidJson(_))
        ));
    }

    #[test]
    fn provider_id_keys_are_checked_in_order() {
        let transfer = parse(json!({
            "description": "x",
            "amount": 1,
            "refNo": "REF-9",
            "tid": 12345
        }))
        .unwrap();
        assert_eq!(transfer.provider_id.as_deref(), Some("12345"));

        let transfer = parse(json!({"description": "x", "amount": 1, "transactionID": "T-1"})).unwrap();
        assert_eq!(transfer.provider_id.as_deref(), Some("T-1"));
    }

    #[test]
    fn listing_returns_every_transaction() {
        let value = json!({"data": [
            {"description": "a", "amount": 1},
            {"description": "b", "amount": 2}
        ]});
        assert_eq!(transaction_objects(&value).unwrap().len(), 2);
        assert!(transaction_objects(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn non_object_elements_are_skipped() {
        let tx = json!({"description": "NAPXU12345678", "amount": 50000, "id": "FT1"});

        let transfer = parse(json!([tx.clone(), null])).unwrap();
        assert_eq!(transfer.provider_id.as_deref(), Some("FT1"));

        let transfer = parse(json!({"data": [null, "noise", tx.clone()]})).unwrap();
        assert_eq!(transfer.provider_id.as_deref(), Some("FT1"));

        let value = json!({"data": [tx, 42, {"description": "b", "amount": 2}]});
        assert_eq!(transaction_objects(&value).unwrap().len(), 2);
    }

    #[test]
    fn array_without_objects_is_rejected() {
        assert_eq!(parse(json!([null, 1])), Err(PayloadError::NotAnObject));
        assert_eq!(parse(json!({"data": ["x"]})), Err(PayloadError::NotAnObject));
    }
}
