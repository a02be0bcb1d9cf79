//! Network identity checks and the Network API responses.

use crate::config::{
    GatewayConfig, MIDDLEWARE_VERSION, OP_STATUS_OK, ROSETTA_VERSION,
};
use crate::rosetta::{
    Allow, ApiError, ErrorKind, NetworkIdentifier, NetworkListResponse, NetworkOptionsResponse,
    OperationStatus, OperationType, Version,
};

/// Fail fast unless `network` names the network this gateway fronts.
/// Sub-networks are not supported.
pub fn validate_network(
    config: &GatewayConfig,
    network: &NetworkIdentifier,
) -> Result<(), ApiError> {
    if network.blockchain != config.blockchain {
        return Err(ApiError::new(ErrorKind::InvalidBlockchain)
            .with_reason(format!("unknown blockchain '{}'", network.blockchain)));
    }
    if network.network != config.network || network.sub_network_identifier.is_some() {
        return Err(ApiError::new(ErrorKind::InvalidNetwork)
            .with_reason(format!("unknown network '{}'", network.network)));
    }
    Ok(())
}

/// The one network this gateway serves.
pub fn network_identifier(config: &GatewayConfig) -> NetworkIdentifier {
    NetworkIdentifier::new(config.blockchain.as_str(), config.network.as_str())
}

pub fn network_list(config: &GatewayConfig) -> NetworkListResponse {
    NetworkListResponse {
        network_identifiers: vec![network_identifier(config)],
    }
}

pub fn network_options(node_version: &str) -> NetworkOptionsResponse {
    NetworkOptionsResponse {
        version: Version {
            rosetta_version: ROSETTA_VERSION.to_string(),
            node_version: node_version.to_string(),
            middleware_version: Some(MIDDLEWARE_VERSION.to_string()),
        },
        allow: Allow {
            operation_statuses: vec![OperationStatus {
                status: OP_STATUS_OK.to_string(),
                successful: true,
            }],
            operation_types: OperationType::ALL
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            errors: ApiError::catalogue(),
            historical_balance_lookup: false,
        },
    }
}
