// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Oasis Gateway Core Library
//!
//! The construction half of a Rosetta gateway for the Oasis consensus
//! layer. It turns Rosetta operation lists into Oasis staking transactions,
//! produces the exact bytes a wallet has to sign, attaches the signature,
//! and hands the result to a node for broadcast.
//!
//! No private key ever passes through this crate in production. Signing
//! happens offline; the gateway only verifies.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants and runtime settings.
//! - **crypto**: SHA-512/256 hashing and Ed25519 key containers.
//! - **cbor**: Canonical CBOR helpers shared by every wire type.
//! - **staking**: Account addresses and token quantities.
//! - **transaction**: Consensus transactions, their bodies, signing and the
//!   JSON envelopes exchanged with clients.
//! - **rosetta**: Rosetta request/response types and the error catalogue.
//! - **construction**: The operation mapper and the construction service.
//! - **client**: The node seam: JSON-RPC client plus an in-memory stand-in.
//!
//! ## Ground Rules
//!
//! 1. Bytes that get signed or hashed are canonical CBOR, always.
//! 2. Amounts are arbitrary precision end to end. No floats anywhere.
//! 3. Every failure that leaves the crate is a catalogued Rosetta error.

pub mod cbor;
pub mod client;
pub mod config;
pub mod construction;
pub mod crypto;
pub mod rosetta;
pub mod staking;
pub mod transaction;
