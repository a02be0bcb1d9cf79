//! The Rosetta error catalogue.
//!
//! Every failure a caller can see is one of a fixed set of coded errors.
//! Internal error enums carry the detail; by the time a failure crosses the
//! API boundary it has been collapsed into an [`ApiError`] with the code of
//! its [`ErrorKind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::Metadata;

/// Error kinds surfaced by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidBlockchain,
    InvalidNetwork,
    InvalidAccountAddress,
    NotImplemented,
    UnableToSubmitTx,
    UnableToGetNextNonce,
    MalformedValue,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::InvalidBlockchain,
        ErrorKind::InvalidNetwork,
        ErrorKind::InvalidAccountAddress,
        ErrorKind::NotImplemented,
        ErrorKind::UnableToSubmitTx,
        ErrorKind::UnableToGetNextNonce,
        ErrorKind::MalformedValue,
    ];

    pub fn code(self) -> i32 {
        match self {
            Self::InvalidBlockchain => 2,
            Self::InvalidNetwork => 3,
            Self::InvalidAccountAddress => 9,
            Self::NotImplemented => 12,
            Self::UnableToSubmitTx => 14,
            Self::UnableToGetNextNonce => 15,
            Self::MalformedValue => 16,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidBlockchain => "invalid blockchain specified in network identifier",
            Self::InvalidNetwork => "invalid network specified in network identifier",
            Self::InvalidAccountAddress => "invalid account address",
            Self::NotImplemented => "not implemented",
            Self::UnableToSubmitTx => "unable to submit transaction",
            Self::UnableToGetNextNonce => "unable to get next nonce",
            Self::MalformedValue => "malformed value",
        }
    }

    /// Only nonce lookups are worth retrying. A resubmitted transaction
    /// is not guaranteed to be a no-op.
    pub fn retriable(self) -> bool {
        matches!(self, Self::UnableToGetNextNonce)
    }
}

/// A Rosetta error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    pub retriable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Metadata>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            code: kind.code(),
            message: kind.message().to_string(),
            retriable: kind.retriable(),
            details: None,
        }
    }

    /// Attach a human-readable reason under `details.error`.
    pub fn with_reason(mut self, reason: impl ToString) -> Self {
        self.details
            .get_or_insert_with(Metadata::new)
            .insert("error".to_string(), reason.to_string().into());
        self
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::ALL.into_iter().find(|k| k.code() == self.code)
    }

    pub fn malformed() -> Self {
        Self::new(ErrorKind::MalformedValue)
    }

    pub fn not_implemented() -> Self {
        Self::new(ErrorKind::NotImplemented)
    }

    pub fn invalid_account_address() -> Self {
        Self::new(ErrorKind::InvalidAccountAddress)
    }

    /// Every error this gateway can return, for `/network/options`.
    pub fn catalogue() -> Vec<ApiError> {
        ErrorKind::ALL.into_iter().map(ApiError::new).collect()
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
