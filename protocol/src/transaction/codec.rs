//! JSON transport encoding for unsigned and signed transactions.
//!
//! This is the form handed back and forth with Rosetta callers as an opaque
//! string. It is meant to be readable in a log line; it is never hashed or
//! signed. Binary fields travel as standard base64.
//!
//! ```text
//! unsigned: {"nonce":5,"fee":{"amount":"10","gas":20000},"method":"staking.Burn","body":"oWZ0b2tlbnNBMg=="}
//! signed:   {"untrusted_raw_value":"pGNmZW...","signature":{"public_key":"...","signature":"..."}}
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::signing::SignedTransaction;
use super::types::{Fee, MethodName, Transaction};
use crate::cbor;

/// Errors from the transport codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid transaction json: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TransactionJson {
    nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fee: Option<Fee>,
    method: MethodName,
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    body: Vec<u8>,
}

impl Serialize for Transaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TransactionJson {
            nonce: self.nonce,
            fee: self.fee.clone(),
            method: self.method.clone(),
            body: self.body.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Transaction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = TransactionJson::deserialize(deserializer)?;
        // The body is spliced verbatim into the canonical encoding.
        if !json.body.is_empty() {
            cbor::check_single_item(&json.body).map_err(serde::de::Error::custom)?;
        }
        Ok(Self {
            nonce: json.nonce,
            fee: json.fee,
            method: json.method,
            body: json.body,
        })
    }
}

/// Render an unsigned transaction in transport form.
pub fn transaction_to_json(tx: &Transaction) -> Result<String, CodecError> {
    Ok(serde_json::to_string(tx)?)
}

/// Parse an unsigned transaction from transport form.
pub fn transaction_from_json(s: &str) -> Result<Transaction, CodecError> {
    Ok(serde_json::from_str(s)?)
}

/// Render a signed transaction in transport form.
pub fn signed_to_json(signed: &SignedTransaction) -> Result<String, CodecError> {
    Ok(serde_json::to_string(signed)?)
}

/// Parse a signed transaction from transport form.
pub fn signed_from_json(s: &str) -> Result<SignedTransaction, CodecError> {
    Ok(serde_json::from_str(s)?)
}
