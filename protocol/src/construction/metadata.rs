//! Typed views of the free-form Rosetta `options` and `metadata` maps.
//!
//! The maps are parsed exactly once at the edge of each endpoint. Past that
//! point the construction logic works with plain structs.
//!
//! | Struct                   | Travels in                                   | Keys       |
//! |--------------------------|----------------------------------------------|------------|
//! | [`MetadataOptions`]      | preprocess response → metadata request       | `id`       |
//! | [`ConstructionMetadata`] | metadata response → payloads request, parse  | `nonce`    |
//! | [`FeeMetadata`]          | fee operation metadata                       | `fee_gas`  |

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_GAS;
use crate::rosetta::Metadata;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata object is missing")]
    Missing,

    #[error("invalid metadata: {0}")]
    Invalid(#[from] serde_json::Error),
}

fn from_map<T: DeserializeOwned>(map: &Metadata) -> Result<T, MetadataError> {
    Ok(serde_json::from_value(serde_json::Value::Object(map.clone()))?)
}

fn to_map<T: Serialize>(value: &T) -> Metadata {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Metadata::new(),
    }
}

/// Options naming the account whose nonce `/construction/metadata` resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOptions {
    pub id: String,
}

impl MetadataOptions {
    pub fn from_options(options: Option<&Metadata>) -> Result<Self, MetadataError> {
        from_map(options.ok_or(MetadataError::Missing)?)
    }

    pub fn to_options(&self) -> Metadata {
        to_map(self)
    }
}

/// Construction metadata carried from `/construction/metadata` into
/// `/construction/payloads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionMetadata {
    pub nonce: u64,
}

impl ConstructionMetadata {
    pub fn from_metadata(metadata: Option<&Metadata>) -> Result<Self, MetadataError> {
        from_map(metadata.ok_or(MetadataError::Missing)?)
    }

    pub fn to_metadata(&self) -> Metadata {
        to_map(self)
    }
}

/// Gas settings attached to the fee operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeMetadata {
    #[serde(default)]
    pub fee_gas: Option<u64>,
}

impl FeeMetadata {
    /// Absent metadata means "use the default gas".
    pub fn from_metadata(metadata: Option<&Metadata>) -> Result<Self, MetadataError> {
        match metadata {
            None => Ok(Self::default()),
            Some(map) => from_map(map),
        }
    }

    pub fn gas(&self) -> u64 {
        self.fee_gas.unwrap_or(DEFAULT_GAS)
    }

    /// Metadata for a parsed fee operation. The gas is always spelled out.
    pub fn for_gas(gas: u64) -> Metadata {
        to_map(&Self { fee_gas: Some(gas) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn options_require_string_id() {
        let ok = MetadataOptions::from_options(Some(&map(json!({"id": "oasis1abc"})))).unwrap();
        assert_eq!(ok.id, "oasis1abc");

        assert!(matches!(
            MetadataOptions::from_options(None),
            Err(MetadataError::Missing)
        ));
        assert!(MetadataOptions::from_options(Some(&map(json!({})))).is_err());
        assert!(MetadataOptions::from_options(Some(&map(json!({"id": 7})))).is_err());
    }

    #[test]
    fn options_roundtrip() {
        let opts = MetadataOptions { id: "x".into() };
        assert_eq!(opts.to_options(), map(json!({"id": "x"})));
    }

    #[test]
    fn nonce_metadata() {
        let md = ConstructionMetadata { nonce: 42 };
        assert_eq!(md.to_metadata(), map(json!({"nonce": 42})));
        assert_eq!(
            ConstructionMetadata::from_metadata(Some(&md.to_metadata())).unwrap(),
            md
        );
        assert!(ConstructionMetadata::from_metadata(None).is_err());
        assert!(ConstructionMetadata::from_metadata(Some(&map(json!({"nonce": "5"})))).is_err());
        assert!(ConstructionMetadata::from_metadata(Some(&map(json!({"nonce": -1})))).is_err());
    }

    #[test]
    fn fee_gas_defaults() {
        assert_eq!(FeeMetadata::from_metadata(None).unwrap().gas(), DEFAULT_GAS);
        assert_eq!(
            FeeMetadata::from_metadata(Some(&map(json!({})))).unwrap().gas(),
            DEFAULT_GAS
        );
        assert_eq!(
            FeeMetadata::from_metadata(Some(&map(json!({"fee_gas": 20000}))))
                .unwrap()
                .gas(),
            20_000
        );
        assert!(FeeMetadata::from_metadata(Some(&map(json!({"fee_gas": "lots"})))).is_err());
    }

    #[test]
    fn parsed_fee_metadata_spells_out_gas() {
        assert_eq!(FeeMetadata::for_gas(0), map(json!({"fee_gas": 0})));
    }
}
