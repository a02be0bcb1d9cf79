//! # Gateway Configuration & Constants
//!
//! Every magic number the gateway relies on lives here. Most of them are
//! dictated by the Oasis staking ledger and the Rosetta specification, so
//! changing one of them is a compatibility break, not a tuning knob.
//!
//! Runtime settings (ports, node endpoint, network identity) are gathered in
//! [`GatewayConfig`], which the binary assembles from its CLI arguments and
//! hands to the construction service.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Network Identity
// ---------------------------------------------------------------------------

/// Blockchain name advertised in every Rosetta `network_identifier`.
pub const BLOCKCHAIN_NAME: &str = "Oasis";

/// Default network name. Deployments normally override it with the chain
/// context (genesis document hash) of the network they front.
pub const DEFAULT_NETWORK_NAME: &str = "mainnet";

/// Bech32 human-readable prefix for staking account addresses.
pub const ADDRESS_HRP: &str = "oasis";

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Rosetta API version this gateway implements.
pub const ROSETTA_VERSION: &str = "1.4.1";

/// Gateway middleware version, reported by `/network/options`.
pub const MIDDLEWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Signature scheme advertised in signing payloads.
pub const SIGNATURE_TYPE: &str = "ed25519";

/// Curve name accepted on `/construction/derive` and `/construction/combine`.
pub const CURVE_TYPE: &str = "edwards25519";

/// Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Domain separation context for staking account addresses.
pub const ADDRESS_CONTEXT: &[u8] = b"oasis-core/address: staking";

/// Address version byte. Only version 0 exists.
pub const ADDRESS_VERSION: u8 = 0;

/// Size of the truncated key hash inside an address.
pub const ADDRESS_HASH_LENGTH: usize = 20;

/// Full binary address size: version byte plus truncated hash.
pub const ADDRESS_LENGTH: usize = 1 + ADDRESS_HASH_LENGTH;

/// Signature context for consensus transactions.
pub const TRANSACTION_SIGNATURE_CONTEXT: &str = "oasis-core/consensus: tx";

// ---------------------------------------------------------------------------
// Construction Metadata Keys
// ---------------------------------------------------------------------------

/// Gas limit used when the fee operation carries no `fee_gas` metadata.
pub const DEFAULT_GAS: u64 = 10_000;

/// Signer address reported by `/construction/parse` for unsigned transactions.
pub const FROM_PLACEHOLDER: &str = "(from)";

// ---------------------------------------------------------------------------
// Currencies & Operations
// ---------------------------------------------------------------------------

/// Symbol of the native staking token.
pub const NATIVE_TOKEN_SYMBOL: &str = "ROSE";

/// Symbol used for escrow pool shares.
pub const POOL_SHARE_SYMBOL: &str = "SHARES";

/// Both currencies use nine decimal places (1 ROSE = 10^9 base units).
pub const CURRENCY_DECIMALS: u32 = 9;

/// Sub-account tag for an account's general (liquid) balance.
pub const SUB_ACCOUNT_GENERAL: &str = "general";

/// Sub-account tag for an account's active escrow balance.
pub const SUB_ACCOUNT_ESCROW: &str = "escrow";

/// Operation status reported by `/network/options`. Construction never
/// assigns statuses, but the Rosetta catalogue requires one.
pub const OP_STATUS_OK: &str = "OK";

// ---------------------------------------------------------------------------
// Networking Defaults
// ---------------------------------------------------------------------------

/// Default port for the Rosetta HTTP API.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

/// Default node JSON-RPC endpoint.
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8545";

/// Upper bound on a single node round trip (nonce lookup or broadcast).
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Runtime settings shared by the construction service and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Blockchain name callers must present.
    pub blockchain: String,
    /// Network name callers must present.
    pub network: String,
    /// Optional chain context appended to the transaction signature context.
    pub chain_context: Option<String>,
    /// Deadline applied to each node call.
    pub node_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            blockchain: BLOCKCHAIN_NAME.to_string(),
            network: DEFAULT_NETWORK_NAME.to_string(),
            chain_context: None,
            node_timeout: DEFAULT_NODE_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// The exact context string prepended to every signing payload.
    ///
    /// With a chain context configured, signatures become chain specific:
    /// `"oasis-core/consensus: tx for chain <context>"`.
    pub fn signature_context(&self) -> String {
        match &self.chain_context {
            Some(chain) if !chain.is_empty() => {
                format!("{} for chain {}", TRANSACTION_SIGNATURE_CONTEXT, chain)
            }
            _ => TRANSACTION_SIGNATURE_CONTEXT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_length_is_version_plus_hash() {
        assert_eq!(ADDRESS_LENGTH, 21);
    }

    #[test]
    fn signature_context_without_chain() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.signature_context(), "oasis-core/consensus: tx");
    }

    #[test]
    fn signature_context_with_chain() {
        let cfg = GatewayConfig {
            chain_context: Some("abcd".into()),
            ..GatewayConfig::default()
        };
        assert_eq!(
            cfg.signature_context(),
            "oasis-core/consensus: tx for chain abcd"
        );
    }

    #[test]
    fn empty_chain_context_is_ignored() {
        let cfg = GatewayConfig {
            chain_context: Some(String::new()),
            ..GatewayConfig::default()
        };
        assert_eq!(cfg.signature_context(), TRANSACTION_SIGNATURE_CONTEXT);
    }
}
