//! # Cryptographic Primitives
//!
//! Everything the construction flow needs from cryptography, and nothing
//! more: SHA-512/256 hashing, Ed25519 key and signature containers, and
//! context-separated signing.
//!
//! All of it is a thin, type-safe wrapper around `sha2` and `ed25519-dalek`.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::Hash;
pub use keys::{KeyError, OasisKeypair, PublicKey, RawSignature};
pub use signatures::{prepare_signer_message, verify, SignatureError};
