//! # Rosetta HTTP API
//!
//! Builds the axum router for the Rosetta Construction and Network APIs.
//! Handlers are thin: decode the body, call [`ConstructionService`], record
//! metrics, and encode the answer.
//!
//! Every Rosetta error is returned as HTTP 500 with the error object as the
//! body, as the Rosetta specification requires. A body that is not valid
//! JSON for the endpoint is reported as a malformed value.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Node call      |
//! |--------|---------------------------|----------------|
//! | GET    | `/health`                 |                |
//! | POST   | `/network/list`           |                |
//! | POST   | `/network/options`        |                |
//! | POST   | `/construction/derive`    |                |
//! | POST   | `/construction/preprocess`|                |
//! | POST   | `/construction/metadata`  | next nonce     |
//! | POST   | `/construction/payloads`  |                |
//! | POST   | `/construction/combine`   |                |
//! | POST   | `/construction/parse`     |                |
//! | POST   | `/construction/hash`      |                |
//! | POST   | `/construction/submit`    | broadcast      |

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use oasis_gateway_protocol::construction::ConstructionService;
use oasis_gateway_protocol::rosetta::{
    ApiError, ConstructionCombineRequest, ConstructionDeriveRequest, ConstructionHashRequest,
    ConstructionMetadataRequest, ConstructionParseRequest, ConstructionPayloadsRequest,
    ConstructionPreprocessRequest, ConstructionSubmitRequest, MetadataRequest, NetworkRequest,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConstructionService>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/network/list", post(network_list_handler))
        .route("/network/options", post(network_options_handler))
        .route("/construction/derive", post(derive_handler))
        .route("/construction/preprocess", post(preprocess_handler))
        .route("/construction/metadata", post(metadata_handler))
        .route("/construction/payloads", post(payloads_handler))
        .route("/construction/combine", post(combine_handler))
        .route("/construction/parse", post(parse_handler))
        .route("/construction/hash", post(hash_handler))
        .route("/construction/submit", post(submit_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error Mapping
// ---------------------------------------------------------------------------

/// A Rosetta error on its way out as an HTTP response.
pub struct RosettaError(pub ApiError);

impl IntoResponse for RosettaError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.0)).into_response()
    }
}

type Body<T> = Result<Json<T>, JsonRejection>;

fn decode<T>(body: Body<T>) -> Result<T, ApiError> {
    body.map(|Json(req)| req).map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected request body");
        ApiError::malformed().with_reason(rejection.body_text())
    })
}

fn respond<T: Serialize>(
    state: &AppState,
    endpoint: &'static str,
    started: Instant,
    result: Result<T, ApiError>,
) -> Response {
    let code = result.as_ref().err().map(|e| e.code);
    state.metrics.observe(endpoint, started.elapsed(), code);
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => RosettaError(err).into_response(),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn network_list_handler(
    State(state): State<AppState>,
    body: Body<MetadataRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).map(|_| state.service.network_list());
    respond(&state, "network/list", started, result)
}

async fn network_options_handler(
    State(state): State<AppState>,
    body: Body<NetworkRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.network_options(&req));
    respond(&state, "network/options", started, result)
}

async fn derive_handler(
    State(state): State<AppState>,
    body: Body<ConstructionDeriveRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.derive(&req));
    respond(&state, "derive", started, result)
}

async fn preprocess_handler(
    State(state): State<AppState>,
    body: Body<ConstructionPreprocessRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.preprocess(&req));
    respond(&state, "preprocess", started, result)
}

async fn metadata_handler(
    State(state): State<AppState>,
    body: Body<ConstructionMetadataRequest>,
) -> Response {
    let started = Instant::now();
    let result = match decode(body) {
        Ok(req) => state.service.metadata(&req).await,
        Err(err) => Err(err),
    };
    respond(&state, "metadata", started, result)
}

async fn payloads_handler(
    State(state): State<AppState>,
    body: Body<ConstructionPayloadsRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.payloads(&req));
    respond(&state, "payloads", started, result)
}

async fn combine_handler(
    State(state): State<AppState>,
    body: Body<ConstructionCombineRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.combine(&req));
    respond(&state, "combine", started, result)
}

async fn parse_handler(
    State(state): State<AppState>,
    body: Body<ConstructionParseRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.parse(&req));
    respond(&state, "parse", started, result)
}

async fn hash_handler(
    State(state): State<AppState>,
    body: Body<ConstructionHashRequest>,
) -> Response {
    let started = Instant::now();
    let result = decode(body).and_then(|req| state.service.hash(&req));
    respond(&state, "hash", started, result)
}

async fn submit_handler(
    State(state): State<AppState>,
    body: Body<ConstructionSubmitRequest>,
) -> Response {
    let started = Instant::now();
    let result = match decode(body) {
        Ok(req) => state.service.submit(&req).await,
        Err(err) => Err(err),
    };
    respond(&state, "submit", started, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body as HttpBody;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use oasis_gateway_protocol::client::InMemoryNodeClient;
    use oasis_gateway_protocol::config::GatewayConfig;
    use oasis_gateway_protocol::crypto::OasisKeypair;
    use oasis_gateway_protocol::staking::Address;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state() -> (AppState, Arc<InMemoryNodeClient>) {
        let node = Arc::new(InMemoryNodeClient::new());
        let service = ConstructionService::new(GatewayConfig::default(), node.clone());
        let state = AppState {
            service: Arc::new(service),
            metrics: Arc::new(crate::metrics::GatewayMetrics::new().unwrap()),
        };
        (state, node)
    }

    fn net() -> Value {
        json!({ "blockchain": "Oasis", "network": "mainnet" })
    }

    async fn post_raw(router: &Router, path: &str, body: String) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(HttpBody::from(body))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Value) {
        post_raw(router, path, body.to_string()).await
    }

    #[tokio::test]
    async fn health_check() {
        let (state, _) = test_state();
        let router = create_router(state);
        let req = Request::builder()
            .uri("/health")
            .body(HttpBody::empty())
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn network_list_and_options() {
        let (state, _) = test_state();
        let router = create_router(state);

        let (status, body) = post_json(&router, "/network/list", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network_identifiers"][0], net());

        let (status, body) =
            post_json(&router, "/network/options", json!({ "network_identifier": net() })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["allow"]["operation_types"], json!(["Transfer", "Burn"]));
    }

    #[tokio::test]
    async fn errors_are_http_500_with_rosetta_body() {
        let (state, _) = test_state();
        let metrics = state.metrics.clone();
        let router = create_router(state);

        let (status, body) = post_json(
            &router,
            "/construction/derive",
            json!({
                "network_identifier": { "blockchain": "Oasis", "network": "testnet" },
                "public_key": { "hex_bytes": "00", "curve_type": "edwards25519" }
            }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 3);
        assert_eq!(body["retriable"], false);
        assert_eq!(
            metrics.errors_total.with_label_values(&["derive", "3"]).get(),
            1
        );
    }

    #[tokio::test]
    async fn invalid_json_is_malformed_value() {
        let (state, _) = test_state();
        let router = create_router(state);
        let (status, body) =
            post_raw(&router, "/construction/hash", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 16);
        assert!(body["details"]["error"].is_string());
    }

    #[tokio::test]
    async fn full_flow_over_http() {
        let (state, node) = test_state();
        let router = create_router(state);
        let kp = OasisKeypair::from_seed(&[9u8; 32]);
        let pk = json!({ "hex_bytes": kp.public_key().to_hex(), "curve_type": "edwards25519" });

        let (_, derived) = post_json(
            &router,
            "/construction/derive",
            json!({ "network_identifier": net(), "public_key": pk }),
        )
        .await;
        let from = derived["address"].as_str().unwrap().to_string();
        let to = Address::from_public_key(&OasisKeypair::from_seed(&[8u8; 32]).public_key())
            .to_string();
        node.set_nonce(from.parse().unwrap(), 7);

        let operations = json!([
            {
                "operation_identifier": { "index": 0 },
                "type": "Transfer",
                "account": { "address": from, "sub_account": { "address": "general" } },
                "amount": { "value": "-100", "currency": { "symbol": "ROSE", "decimals": 9 } }
            },
            {
                "operation_identifier": { "index": 1 },
                "type": "Transfer",
                "account": { "address": from, "sub_account": { "address": "general" } },
                "amount": { "value": "-1000", "currency": { "symbol": "ROSE", "decimals": 9 } }
            },
            {
                "operation_identifier": { "index": 2 },
                "type": "Transfer",
                "account": { "address": to, "sub_account": { "address": "general" } },
                "amount": { "value": "1000", "currency": { "symbol": "ROSE", "decimals": 9 } }
            }
        ]);

        let (status, pre) = post_json(
            &router,
            "/construction/preprocess",
            json!({ "network_identifier": net(), "operations": operations }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, meta) = post_json(
            &router,
            "/construction/metadata",
            json!({ "network_identifier": net(), "options": pre["options"] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(meta["metadata"]["nonce"], 7);

        let (status, payloads) = post_json(
            &router,
            "/construction/payloads",
            json!({
                "network_identifier": net(),
                "operations": operations,
                "metadata": meta["metadata"]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let payload = payloads["payloads"][0].clone();
        let bytes = hex::decode(payload["hex_bytes"].as_str().unwrap()).unwrap();
        let signature = kp.sign(&bytes);

        let (status, combined) = post_json(
            &router,
            "/construction/combine",
            json!({
                "network_identifier": net(),
                "unsigned_transaction": payloads["unsigned_transaction"],
                "signatures": [{
                    "signing_payload": payload,
                    "public_key": pk,
                    "signature_type": "ed25519",
                    "hex_bytes": signature.to_hex()
                }]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let signed = combined["signed_transaction"].clone();

        let (status, parsed) = post_json(
            &router,
            "/construction/parse",
            json!({ "network_identifier": net(), "signed": true, "transaction": signed }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parsed["signers"], json!([from]));
        assert_eq!(parsed["operations"].as_array().unwrap().len(), 3);

        let (_, hashed) = post_json(
            &router,
            "/construction/hash",
            json!({ "network_identifier": net(), "signed_transaction": signed }),
        )
        .await;
        let (status, submitted) = post_json(
            &router,
            "/construction/submit",
            json!({ "network_identifier": net(), "signed_transaction": signed }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            submitted["transaction_identifier"]["hash"],
            hashed["transaction_hash"]
        );
        assert_eq!(node.submitted().len(), 1);
    }
}
