//! # Construction Flow
//!
//! Offline transaction construction for the Oasis staking ledger, as the
//! Rosetta Construction API expects it:
//!
//! ```text
//! derive ─► preprocess ─► metadata ─► payloads ─► (sign offline) ─► combine ─► hash ─► submit
//!                                        │                            │
//!                                        └─────────── parse ──────────┘
//! ```
//!
//! Only `metadata` and `submit` touch the node. Everything else is pure
//! computation over the request.
//!
//! - [`amount`] converts Rosetta decimal amounts to and from quantities.
//! - [`metadata`] holds the typed views of the free-form metadata maps.
//! - [`mapper`] translates operation lists to transactions and back.
//! - [`network`] checks network identifiers and builds the Network API answers.
//! - [`service`] ties it together behind [`ConstructionService`].

pub mod amount;
pub mod mapper;
pub mod metadata;
pub mod network;
pub mod service;

pub use mapper::{build_transaction, parse_operations, Construction, MappingError, PATTERNS};
pub use metadata::{ConstructionMetadata, FeeMetadata, MetadataError, MetadataOptions};
pub use network::validate_network;
pub use service::ConstructionService;
