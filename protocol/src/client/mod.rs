//! # Node Client
//!
//! The gateway's only outbound dependency: an Oasis node that can report
//! an account's next nonce and accept a signed transaction for broadcast.
//!
//! [`NodeClient`] is the seam. [`rpc::JsonRpcNodeClient`] talks JSON-RPC
//! over HTTP to a real node; [`mock::InMemoryNodeClient`] stands in for one
//! in tests and offline runs.
//!
//! Neither call is retried here. A failed nonce lookup is safe for the
//! caller to repeat; a failed submit may or may not have reached the chain.

pub mod mock;
pub mod rpc;

use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::staking::Address;
use crate::transaction::SignedTransaction;

pub use mock::InMemoryNodeClient;
pub use rpc::JsonRpcNodeClient;

/// Errors reported by a node client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("node transport error: {0}")]
    Transport(String),

    #[error("node returned error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("invalid node response: {0}")]
    InvalidResponse(String),

    #[error("node did not answer within {0:?}")]
    DeadlineExceeded(Duration),
}

/// Block height a query is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Height {
    /// The most recent block the node knows about.
    Latest,
    Number(u64),
}

impl Serialize for Height {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Latest => serializer.serialize_str("latest"),
            Self::Number(h) => serializer.serialize_u64(*h),
        }
    }
}

/// The node operations the construction service needs.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Next valid nonce for `address` at `height`.
    async fn get_next_nonce(&self, address: &Address, height: Height) -> Result<u64, NodeError>;

    /// Broadcast a signed transaction.
    async fn submit_tx(&self, signed: &SignedTransaction) -> Result<(), NodeError>;
}

/// Run a node call under a deadline. Dropping the returned future cancels
/// the call.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, NodeError>
where
    F: Future<Output = Result<T, NodeError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(NodeError::DeadlineExceeded(deadline)),
    }
}
