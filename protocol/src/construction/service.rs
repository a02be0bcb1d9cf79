//! # Construction Service
//!
//! The eight Construction API operations plus the Network API, independent
//! of any HTTP framework. Each call checks the network identifier first,
//! then runs its pipeline. Internal errors are collapsed into the Rosetta
//! catalogue at this boundary, with the underlying reason kept under
//! `details.error`.
//!
//! Every public method runs inside its own `tracing` span carrying the
//! endpoint name, so log lines from one request can be told apart.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use super::mapper::{build_transaction, parse_operations, MappingError};
use super::metadata::{ConstructionMetadata, MetadataOptions};
use super::network::{network_list, network_options, validate_network};
use crate::client::{with_deadline, Height, NodeClient};
use crate::config::{GatewayConfig, CURVE_TYPE, SIGNATURE_TYPE};
use crate::crypto::{KeyError, PublicKey, RawSignature};
use crate::rosetta::{
    AccountIdentifier, ApiError, ConstructionCombineRequest, ConstructionCombineResponse,
    ConstructionDeriveRequest, ConstructionDeriveResponse, ConstructionHashRequest,
    ConstructionHashResponse, ConstructionMetadataRequest, ConstructionMetadataResponse,
    ConstructionParseRequest, ConstructionParseResponse, ConstructionPayloadsRequest,
    ConstructionPayloadsResponse, ConstructionPreprocessRequest, ConstructionPreprocessResponse,
    ConstructionSubmitRequest, ConstructionSubmitResponse, ErrorKind, NetworkIdentifier,
    NetworkListResponse, NetworkOptionsResponse, NetworkRequest, SigningPayload,
    TransactionIdentifier,
};
use crate::staking::Address;
use crate::transaction::{
    combine, prepare_signing_payload, signed_from_json, signed_to_json, transaction_from_json,
    transaction_to_json, Signature, SignedTransaction,
};

/// Node version reported by `/network/options`; the gateway does not
/// query it.
const NODE_VERSION: &str = "unknown";

/// Log a rejected request and attach the reason to the error.
fn reject(err: ApiError, reason: impl fmt::Display) -> ApiError {
    warn!(code = err.code, reason = %reason, "request rejected");
    err.with_reason(reason)
}

fn malformed(reason: impl fmt::Display) -> ApiError {
    reject(ApiError::malformed(), reason)
}

fn mapping_error(err: MappingError) -> ApiError {
    let kind = if err.is_unsupported() {
        ApiError::not_implemented()
    } else {
        ApiError::malformed()
    };
    reject(kind, err)
}

/// Stateless construction backend shared by all requests.
pub struct ConstructionService {
    config: GatewayConfig,
    node: Arc<dyn NodeClient>,
}

impl ConstructionService {
    pub fn new(config: GatewayConfig, node: Arc<dyn NodeClient>) -> Self {
        Self { config, node }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn check_network(&self, network: &NetworkIdentifier) -> Result<(), ApiError> {
        validate_network(&self.config, network).map_err(|err| {
            warn!(
                code = err.code,
                blockchain = %network.blockchain,
                network = %network.network,
                "network validation failed"
            );
            err
        })
    }

    // -----------------------------------------------------------------------
    // Network API
    // -----------------------------------------------------------------------

    pub fn network_list(&self) -> NetworkListResponse {
        network_list(&self.config)
    }

    #[instrument(skip_all, fields(endpoint = "network/options"))]
    pub fn network_options(&self, req: &NetworkRequest) -> Result<NetworkOptionsResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        Ok(network_options(NODE_VERSION))
    }

    // -----------------------------------------------------------------------
    // Construction API
    // -----------------------------------------------------------------------

    /// Derive the account address of an Ed25519 public key.
    #[instrument(skip_all, fields(endpoint = "derive"))]
    pub fn derive(
        &self,
        req: &ConstructionDeriveRequest,
    ) -> Result<ConstructionDeriveResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        if req.public_key.curve_type != CURVE_TYPE {
            return Err(malformed(format!(
                "unsupported curve type '{}'",
                req.public_key.curve_type
            )));
        }
        let public_key = PublicKey::try_from_slice(&req.public_key.hex_bytes).map_err(malformed)?;
        let address = Address::from_public_key(&public_key).to_string();

        debug!(%address, "derived address");
        Ok(ConstructionDeriveResponse {
            address: address.clone(),
            account_identifier: AccountIdentifier {
                address,
                sub_account: None,
                metadata: None,
            },
        })
    }

    /// Name the account whose nonce the caller has to fetch next.
    #[instrument(skip_all, fields(endpoint = "preprocess"))]
    pub fn preprocess(
        &self,
        req: &ConstructionPreprocessRequest,
    ) -> Result<ConstructionPreprocessResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        let fee_op = req
            .operations
            .first()
            .ok_or_else(|| malformed(MappingError::MissingFeeOperation))?;
        let account = fee_op
            .account
            .as_ref()
            .ok_or_else(|| malformed("fee operation has no account"))?;

        let options = MetadataOptions {
            id: account.address.clone(),
        };
        debug!(id = %options.id, "preprocessed");
        Ok(ConstructionPreprocessResponse {
            options: options.to_options(),
        })
    }

    /// Resolve the next nonce of the account named in `options.id`.
    #[instrument(skip_all, fields(endpoint = "metadata"))]
    pub async fn metadata(
        &self,
        req: &ConstructionMetadataRequest,
    ) -> Result<ConstructionMetadataResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        let options = MetadataOptions::from_options(req.options.as_ref())
            .map_err(|e| reject(ApiError::invalid_account_address(), e))?;
        let owner: Address = options
            .id
            .parse()
            .map_err(|e| reject(ApiError::invalid_account_address(), e))?;

        let nonce = with_deadline(
            self.config.node_timeout,
            self.node.get_next_nonce(&owner, Height::Latest),
        )
        .await
        .map_err(|e| {
            error!(account = %owner, error = %e, "unable to get next nonce");
            ApiError::new(ErrorKind::UnableToGetNextNonce).with_reason(e)
        })?;

        debug!(account = %owner, nonce, "resolved nonce");
        Ok(ConstructionMetadataResponse {
            metadata: ConstructionMetadata { nonce }.to_metadata(),
        })
    }

    /// Build the unsigned transaction and the one payload its signer signs.
    #[instrument(skip_all, fields(endpoint = "payloads"))]
    pub fn payloads(
        &self,
        req: &ConstructionPayloadsRequest,
    ) -> Result<ConstructionPayloadsResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        let ConstructionMetadata { nonce } =
            ConstructionMetadata::from_metadata(req.metadata.as_ref()).map_err(malformed)?;

        let construction = build_transaction(&req.operations, nonce).map_err(mapping_error)?;
        let tx = &construction.transaction;
        let payload = prepare_signing_payload(&self.config.signature_context(), tx)
            .map_err(malformed)?;
        let unsigned_transaction = transaction_to_json(tx).map_err(malformed)?;
        let signer = construction.signer.to_string();

        debug!(method = %tx.method, nonce, %signer, "built unsigned transaction");
        Ok(ConstructionPayloadsResponse {
            unsigned_transaction,
            payloads: vec![SigningPayload {
                address: Some(signer.clone()),
                account_identifier: Some(AccountIdentifier {
                    address: signer,
                    sub_account: None,
                    metadata: None,
                }),
                hex_bytes: payload,
                signature_type: Some(SIGNATURE_TYPE.to_string()),
            }],
        })
    }

    /// Attach the detached signature to the unsigned transaction.
    #[instrument(skip_all, fields(endpoint = "combine"))]
    pub fn combine(
        &self,
        req: &ConstructionCombineRequest,
    ) -> Result<ConstructionCombineResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        let tx = transaction_from_json(&req.unsigned_transaction).map_err(malformed)?;

        let signatures = req
            .signatures
            .iter()
            .map(|sig| -> Result<Signature, KeyError> {
                Ok(Signature {
                    public_key: PublicKey::try_from_slice(&sig.public_key.hex_bytes)?,
                    signature: RawSignature::try_from_slice(&sig.hex_bytes)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(malformed)?;
        let signed = combine(&tx, &signatures).map_err(malformed)?;
        let signed_transaction = signed_to_json(&signed).map_err(malformed)?;

        debug!(method = %tx.method, nonce = tx.nonce, "combined");
        Ok(ConstructionCombineResponse { signed_transaction })
    }

    /// Describe an unsigned or signed transaction as operations.
    #[instrument(skip_all, fields(endpoint = "parse", signed = req.signed))]
    pub fn parse(
        &self,
        req: &ConstructionParseRequest,
    ) -> Result<ConstructionParseResponse, ApiError> {
        self.check_network(&req.network_identifier)?;

        let (tx, signer) = if req.signed {
            let signed = signed_from_json(&req.transaction).map_err(malformed)?;
            let (tx, public_key) = signed
                .open(&self.config.signature_context())
                .map_err(malformed)?;
            (tx, Some(Address::from_public_key(&public_key)))
        } else {
            (transaction_from_json(&req.transaction).map_err(malformed)?, None)
        };

        let operations = parse_operations(&tx, signer.as_ref()).map_err(mapping_error)?;
        let signers = signer.iter().map(Address::to_string).collect();

        debug!(method = %tx.method, nonce = tx.nonce, ops = operations.len(), "parsed");
        Ok(ConstructionParseResponse {
            operations,
            signers,
            metadata: Some(ConstructionMetadata { nonce: tx.nonce }.to_metadata()),
        })
    }

    /// Transaction id of a signed transaction.
    #[instrument(skip_all, fields(endpoint = "hash"))]
    pub fn hash(&self, req: &ConstructionHashRequest) -> Result<ConstructionHashResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        let signed = signed_from_json(&req.signed_transaction).map_err(malformed)?;
        let hash = signed.hash().map_err(malformed)?;

        debug!(%hash, "hashed");
        Ok(ConstructionHashResponse {
            transaction_hash: hash.to_hex(),
        })
    }

    /// Broadcast a signed transaction and return its id.
    ///
    /// The transaction is decoded before anything is sent, so a malformed
    /// one never reaches the node.
    #[instrument(skip_all, fields(endpoint = "submit"))]
    pub async fn submit(
        &self,
        req: &ConstructionSubmitRequest,
    ) -> Result<ConstructionSubmitResponse, ApiError> {
        self.check_network(&req.network_identifier)?;
        let signed: SignedTransaction =
            signed_from_json(&req.signed_transaction).map_err(malformed)?;
        let hash = signed.hash().map_err(malformed)?;

        with_deadline(self.config.node_timeout, self.node.submit_tx(&signed))
            .await
            .map_err(|e| {
                error!(%hash, error = %e, "unable to submit transaction");
                ApiError::new(ErrorKind::UnableToSubmitTx).with_reason(e)
            })?;

        debug!(%hash, "submitted");
        Ok(ConstructionSubmitResponse {
            transaction_identifier: TransactionIdentifier {
                hash: hash.to_hex(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{InMemoryNodeClient, NodeError};
    use crate::crypto::OasisKeypair;
    use crate::rosetta::{self, Amount, Currency, Operation, OperationType, SubAccount};
    use serde_json::json;
    use std::time::Duration;

    fn service() -> (ConstructionService, Arc<InMemoryNodeClient>) {
        let node = Arc::new(InMemoryNodeClient::new());
        let svc = ConstructionService::new(GatewayConfig::default(), node.clone());
        (svc, node)
    }

    fn net() -> NetworkIdentifier {
        NetworkIdentifier::new("Oasis", "mainnet")
    }

    fn rosetta_key(kp: &OasisKeypair) -> rosetta::PublicKey {
        rosetta::PublicKey {
            hex_bytes: kp.public_key().as_bytes().to_vec(),
            curve_type: CURVE_TYPE.to_string(),
        }
    }

    fn burn_ops(a: &str) -> Vec<Operation> {
        vec![
            Operation::new(
                0,
                OperationType::Transfer,
                AccountIdentifier::with_sub_account(a, SubAccount::General),
                Amount::new("-1", Currency::native()),
            ),
            Operation::new(
                1,
                OperationType::Burn,
                AccountIdentifier::with_sub_account(a, SubAccount::General),
                Amount::new("-50", Currency::native()),
            ),
        ]
    }

    fn payloads_request(ops: Vec<Operation>, nonce: u64) -> ConstructionPayloadsRequest {
        ConstructionPayloadsRequest {
            network_identifier: net(),
            operations: ops,
            metadata: json!({ "nonce": nonce }).as_object().cloned(),
            public_keys: None,
        }
    }

    #[test]
    fn derive_rejects_bad_keys() {
        let (svc, _) = service();
        let mut req = ConstructionDeriveRequest {
            network_identifier: net(),
            public_key: rosetta::PublicKey {
                hex_bytes: vec![1u8; 31],
                curve_type: CURVE_TYPE.into(),
            },
            metadata: None,
        };
        assert_eq!(svc.derive(&req).unwrap_err().code, 16);

        req.public_key.hex_bytes = vec![1u8; 32];
        req.public_key.curve_type = "secp256k1".into();
        assert_eq!(svc.derive(&req).unwrap_err().code, 16);

        req.public_key.curve_type = CURVE_TYPE.into();
        assert_eq!(
            svc.derive(&req).unwrap().address,
            "oasis1qz8z2pgnvk3slhqvq0d56uf5tdhwyec325rpfv6k"
        );
    }

    #[test]
    fn network_checked_first() {
        let (svc, _) = service();
        let req = ConstructionPreprocessRequest {
            network_identifier: NetworkIdentifier::new("Oasis", "testnet"),
            operations: Vec::new(),
            metadata: None,
        };
        assert_eq!(svc.preprocess(&req).unwrap_err().code, 3);
    }

    #[test]
    fn preprocess_requires_fee_op() {
        let (svc, _) = service();
        let req = ConstructionPreprocessRequest {
            network_identifier: net(),
            operations: Vec::new(),
            metadata: None,
        };
        assert_eq!(svc.preprocess(&req).unwrap_err().code, 16);

        let req = ConstructionPreprocessRequest {
            operations: burn_ops("oasis1abc"),
            ..req
        };
        assert_eq!(svc.preprocess(&req).unwrap().options["id"], "oasis1abc");
    }

    #[tokio::test]
    async fn metadata_error_paths() {
        let (svc, node) = service();
        let mut req = ConstructionMetadataRequest {
            network_identifier: net(),
            options: None,
        };
        assert_eq!(svc.metadata(&req).await.unwrap_err().code, 9);

        req.options = json!({ "id": 5 }).as_object().cloned();
        assert_eq!(svc.metadata(&req).await.unwrap_err().code, 9);

        req.options = json!({ "id": "not-an-address" }).as_object().cloned();
        assert_eq!(svc.metadata(&req).await.unwrap_err().code, 9);

        let kp = OasisKeypair::from_seed(&[1u8; 32]);
        let addr = Address::from_public_key(&kp.public_key());
        req.options = json!({ "id": addr.to_string() }).as_object().cloned();
        node.set_nonce(addr, 41);
        assert_eq!(svc.metadata(&req).await.unwrap().metadata["nonce"], 41);

        node.fail_nonce_lookups(NodeError::Transport("down".into()));
        let err = svc.metadata(&req).await.unwrap_err();
        assert_eq!(err.code, 15);
        assert!(err.retriable);
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_deadline() {
        let node = Arc::new(InMemoryNodeClient::new());
        node.set_delay(Duration::from_secs(60));
        let svc = ConstructionService::new(
            GatewayConfig {
                node_timeout: Duration::from_secs(1),
                ..GatewayConfig::default()
            },
            node,
        );
        let addr = Address::from_public_key(&PublicKey::from_bytes([1u8; 32]));
        let req = ConstructionMetadataRequest {
            network_identifier: net(),
            options: json!({ "id": addr.to_string() }).as_object().cloned(),
        };
        let err = svc.metadata(&req).await.unwrap_err();
        assert_eq!(err.code, 15);
        let reason = err.details.unwrap()["error"].as_str().unwrap().to_string();
        assert!(reason.contains("did not answer"));
    }

    #[test]
    fn payloads_requires_nonce() {
        let (svc, _) = service();
        let mut req = payloads_request(burn_ops("x"), 0);
        req.metadata = None;
        assert_eq!(svc.payloads(&req).unwrap_err().code, 16);
    }

    #[test]
    fn payloads_fee_only_is_not_implemented() {
        let (svc, _) = service();
        let a = Address::from_public_key(&PublicKey::from_bytes([1u8; 32])).to_string();
        let mut ops = burn_ops(&a);
        ops.truncate(1);
        assert_eq!(svc.payloads(&payloads_request(ops, 0)).unwrap_err().code, 12);
    }

    #[test]
    fn full_pipeline() {
        let (svc, _) = service();
        let kp = OasisKeypair::from_seed(&[4u8; 32]);
        let a = svc
            .derive(&ConstructionDeriveRequest {
                network_identifier: net(),
                public_key: rosetta_key(&kp),
                metadata: None,
            })
            .unwrap()
            .address;

        let payloads = svc.payloads(&payloads_request(burn_ops(&a), 3)).unwrap();
        assert_eq!(payloads.payloads.len(), 1);
        let payload = &payloads.payloads[0];
        assert_eq!(payload.address.as_deref(), Some(a.as_str()));
        assert_eq!(payload.signature_type.as_deref(), Some("ed25519"));

        let sig = kp.sign(&payload.hex_bytes);
        let combined = svc
            .combine(&ConstructionCombineRequest {
                network_identifier: net(),
                unsigned_transaction: payloads.unsigned_transaction.clone(),
                signatures: vec![rosetta::Signature {
                    signing_payload: payload.clone(),
                    public_key: rosetta_key(&kp),
                    signature_type: "ed25519".into(),
                    hex_bytes: sig.as_bytes().to_vec(),
                }],
            })
            .unwrap();

        let parsed = svc
            .parse(&ConstructionParseRequest {
                network_identifier: net(),
                signed: true,
                transaction: combined.signed_transaction.clone(),
            })
            .unwrap();
        assert_eq!(parsed.signers, vec![a.clone()]);
        assert_eq!(parsed.metadata.unwrap()["nonce"], 3);
        assert_eq!(parsed.operations[1].account.as_ref().unwrap().address, a);

        let hash = svc
            .hash(&ConstructionHashRequest {
                network_identifier: net(),
                signed_transaction: combined.signed_transaction.clone(),
            })
            .unwrap();
        assert_eq!(hash.transaction_hash.len(), 64);
    }

    #[test]
    fn combine_rejects_wrong_arity_and_lengths() {
        let (svc, _) = service();
        let kp = OasisKeypair::from_seed(&[4u8; 32]);
        let a = Address::from_public_key(&kp.public_key()).to_string();
        let payloads = svc.payloads(&payloads_request(burn_ops(&a), 0)).unwrap();
        let payload = payloads.payloads[0].clone();
        let good = rosetta::Signature {
            signing_payload: payload.clone(),
            public_key: rosetta_key(&kp),
            signature_type: "ed25519".into(),
            hex_bytes: kp.sign(&payload.hex_bytes).as_bytes().to_vec(),
        };
        let mut req = ConstructionCombineRequest {
            network_identifier: net(),
            unsigned_transaction: payloads.unsigned_transaction,
            signatures: Vec::new(),
        };
        assert_eq!(svc.combine(&req).unwrap_err().code, 16);

        req.signatures = vec![good.clone(), good.clone()];
        assert_eq!(svc.combine(&req).unwrap_err().code, 16);

        let mut short = good.clone();
        short.hex_bytes.truncate(63);
        req.signatures = vec![short];
        assert_eq!(svc.combine(&req).unwrap_err().code, 16);

        req.signatures = vec![good];
        assert!(svc.combine(&req).is_ok());
    }

    #[test]
    fn combine_rejects_body_that_is_not_one_cbor_item() {
        let (svc, _) = service();
        let kp = OasisKeypair::from_seed(&[4u8; 32]);
        let a = Address::from_public_key(&kp.public_key()).to_string();
        let payloads = svc.payloads(&payloads_request(burn_ops(&a), 0)).unwrap();
        let payload = payloads.payloads[0].clone();
        let signature = rosetta::Signature {
            signing_payload: payload.clone(),
            public_key: rosetta_key(&kp),
            signature_type: "ed25519".into(),
            hex_bytes: kp.sign(&payload.hex_bytes).as_bytes().to_vec(),
        };
        // Body bytes 01 02 are two CBOR items.
        let err = svc
            .combine(&ConstructionCombineRequest {
                network_identifier: net(),
                unsigned_transaction: r#"{"nonce":1,"method":"staking.Transfer","body":"AQI="}"#
                    .into(),
                signatures: vec![signature],
            })
            .unwrap_err();
        assert_eq!(err.code, 16);
    }

    #[test]
    fn parse_rejects_body_with_oversized_map_header() {
        let (svc, _) = service();
        let err = svc
            .parse(&ConstructionParseRequest {
                network_identifier: net(),
                signed: false,
                transaction: r#"{"nonce":1,"method":"staking.Transfer","body":"uwAAAQAAAAAA"}"#
                    .into(),
            })
            .unwrap_err();
        assert_eq!(err.code, 16);
    }

    #[test]
    fn parse_rejects_bad_signature() {
        let (svc, _) = service();
        let kp = OasisKeypair::from_seed(&[4u8; 32]);
        let a = Address::from_public_key(&kp.public_key()).to_string();
        let payloads = svc.payloads(&payloads_request(burn_ops(&a), 0)).unwrap();
        let payload = payloads.payloads[0].clone();
        // Signed over the wrong bytes.
        let wrong = kp.sign(b"something else");
        let combined = svc
            .combine(&ConstructionCombineRequest {
                network_identifier: net(),
                unsigned_transaction: payloads.unsigned_transaction,
                signatures: vec![rosetta::Signature {
                    signing_payload: payload,
                    public_key: rosetta_key(&kp),
                    signature_type: "ed25519".into(),
                    hex_bytes: wrong.as_bytes().to_vec(),
                }],
            })
            .unwrap();
        let err = svc
            .parse(&ConstructionParseRequest {
                network_identifier: net(),
                signed: true,
                transaction: combined.signed_transaction,
            })
            .unwrap_err();
        assert_eq!(err.code, 16);
    }

    #[tokio::test]
    async fn submit_decodes_before_broadcast() {
        let (svc, node) = service();
        let req = ConstructionSubmitRequest {
            network_identifier: net(),
            signed_transaction: "{}".into(),
        };
        assert_eq!(svc.submit(&req).await.unwrap_err().code, 16);
        assert!(node.submitted().is_empty());
    }

    #[tokio::test]
    async fn submit_failure_is_not_retriable() {
        let (svc, node) = service();
        let kp = OasisKeypair::from_seed(&[6u8; 32]);
        let a = Address::from_public_key(&kp.public_key()).to_string();
        let payloads = svc.payloads(&payloads_request(burn_ops(&a), 0)).unwrap();
        let payload = payloads.payloads[0].clone();
        let combined = svc
            .combine(&ConstructionCombineRequest {
                network_identifier: net(),
                unsigned_transaction: payloads.unsigned_transaction,
                signatures: vec![rosetta::Signature {
                    public_key: rosetta_key(&kp),
                    signature_type: "ed25519".into(),
                    hex_bytes: kp.sign(&payload.hex_bytes).as_bytes().to_vec(),
                    signing_payload: payload,
                }],
            })
            .unwrap();

        node.fail_submissions(NodeError::Rpc {
            code: -32003,
            message: "rejected".into(),
        });
        let err = svc
            .submit(&ConstructionSubmitRequest {
                network_identifier: net(),
                signed_transaction: combined.signed_transaction,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, 14);
        assert!(!err.retriable);
    }
}
