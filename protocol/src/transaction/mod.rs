//! # Transaction Module
//!
//! Consensus transactions as the gateway builds, signs and takes apart.
//!
//! ## Architecture
//!
//! ```text
//! types.rs    Transaction, Fee, MethodName and the staking method bodies (canonical CBOR)
//! codec.rs    JSON transport form exchanged with Rosetta callers
//! signing.rs  Signing payloads, combine, open and transaction hashing
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`Transaction::new`] wraps a typed method body.
//! 2. **Prepare**: [`prepare_signing_payload`] yields the bytes to sign.
//! 3. **Combine**: [`combine`] attaches the detached signature.
//! 4. **Open**: [`SignedTransaction::open`] verifies and decodes again.
//! 5. **Identify**: [`SignedTransaction::hash`] gives the transaction id.
//!
//! ## Design Decisions
//!
//! - Only the canonical CBOR form is ever signed or hashed. The JSON form is
//!   a transport convenience and may reorder fields freely.
//! - Quantities are unbounded integers. No floating point anywhere near
//!   monetary values.
//! - The body is kept as raw CBOR inside [`Transaction`], so methods this
//!   gateway does not understand still round-trip byte for byte.

pub mod codec;
pub mod signing;
pub mod types;

pub use codec::{
    signed_from_json, signed_to_json, transaction_from_json, transaction_to_json, CodecError,
};
pub use signing::{combine, prepare_signing_payload, Signature, SignedTransaction, SigningError};
pub use types::{
    Burn, Escrow, Fee, MethodBody, MethodName, ReclaimEscrow, Transaction, Transfer,
};
