//! In-memory node client for tests and offline runs.

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::time::Duration;

use super::{Height, NodeClient, NodeError};
use crate::staking::Address;
use crate::transaction::SignedTransaction;

#[derive(Debug, Default)]
struct State {
    nonces: HashMap<Address, u64>,
    submitted: Vec<SignedTransaction>,
    fail_nonce: Option<NodeError>,
    fail_submit: Option<NodeError>,
    delay: Option<Duration>,
}

/// A node that keeps nonces in a map and records submissions.
///
/// Unknown accounts have nonce 0. Failures and latency can be injected to
/// exercise the error paths of the construction service.
#[derive(Debug, Default)]
pub struct InMemoryNodeClient {
    state: Mutex<State>,
}

impl InMemoryNodeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.lock().nonces.insert(address, nonce);
    }

    pub fn fail_nonce_lookups(&self, error: NodeError) {
        self.lock().fail_nonce = Some(error);
    }

    pub fn fail_submissions(&self, error: NodeError) {
        self.lock().fail_submit = Some(error);
    }

    /// Delay every call by `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    /// Transactions accepted so far, in order.
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock()
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl NodeClient for InMemoryNodeClient {
    async fn get_next_nonce(&self, address: &Address, _height: Height) -> Result<u64, NodeError> {
        self.pause().await;
        let state = self.lock();
        if let Some(err) = &state.fail_nonce {
            return Err(err.clone());
        }
        Ok(state.nonces.get(address).copied().unwrap_or(0))
    }

    async fn submit_tx(&self, signed: &SignedTransaction) -> Result<(), NodeError> {
        self.pause().await;
        let mut state = self.lock();
        if let Some(err) = &state.fail_submit {
            return Err(err.clone());
        }
        state.submitted.push(signed.clone());
        Ok(())
    }
}
