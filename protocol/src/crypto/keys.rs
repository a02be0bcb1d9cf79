//! # Key Material
//!
//! Ed25519 public keys and raw signatures as they travel through the
//! construction flow. The gateway never holds private keys in production;
//! [`OasisKeypair`] exists so tests, benches and offline tooling can play the
//! part of the external signer.
//!
//! Both [`PublicKey`] and [`RawSignature`] are *length-checked only*. Whether
//! the bytes form a valid curve point is decided at verification time, which
//! is the point where an invalid key actually matters.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur while decoding key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid public key: expected {expected} bytes, got {0}", expected = PUBLIC_KEY_LENGTH)]
    InvalidPublicKeyLength(usize),

    #[error("invalid signature: expected {expected} bytes, got {0}", expected = SIGNATURE_LENGTH)]
    InvalidSignatureLength(usize),

    #[error("public key is not a valid Ed25519 point")]
    InvalidPoint,
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// A 32-byte Ed25519 public key.
///
/// JSON form is base64, matching the chain's signed transaction envelope.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Length-checked conversion from an arbitrary byte slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PUBLIC_KEY_LENGTH] = slice
            .try_into()
            .map_err(|_| KeyError::InvalidPublicKeyLength(slice.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Convert to a dalek verifying key. Fails for bytes that are not a
    /// valid compressed Edwards point.
    pub fn to_verifying_key(&self) -> Result<VerifyingKey, KeyError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| KeyError::InvalidPoint)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)?;
        Self::try_from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RawSignature
// ---------------------------------------------------------------------------

/// A detached 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawSignature([u8; SIGNATURE_LENGTH]);

impl RawSignature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Length-checked conversion from an arbitrary byte slice.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; SIGNATURE_LENGTH] = slice
            .try_into()
            .map_err(|_| KeyError::InvalidSignatureLength(slice.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "RawSignature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

impl Serialize for RawSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for RawSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)?;
        Self::try_from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// OasisKeypair
// ---------------------------------------------------------------------------

/// An Ed25519 keypair standing in for the external signer.
///
/// Intentionally not `Serialize`: exporting secret material has to be an
/// explicit call to [`secret_key_bytes`](Self::secret_key_bytes).
pub struct OasisKeypair {
    signing_key: SigningKey,
}

impl OasisKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign an arbitrary message (normally a signing payload).
    pub fn sign(&self, message: &[u8]) -> RawSignature {
        RawSignature(self.signing_key.sign(message).to_bytes())
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for OasisKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material.
        write!(f, "OasisKeypair(pub={})", self.public_key().to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_rejects_wrong_length() {
        assert_eq!(
            PublicKey::try_from_slice(&[0u8; 31]),
            Err(KeyError::InvalidPublicKeyLength(31))
        );
        assert!(PublicKey::try_from_slice(&[0u8; 33]).is_err());
    }

    #[test]
    fn signature_rejects_wrong_length() {
        assert_eq!(
            RawSignature::try_from_slice(&[0u8; 63]),
            Err(KeyError::InvalidSignatureLength(63))
        );
    }

    #[test]
    fn public_key_hex_roundtrip() {
        let kp = OasisKeypair::generate();
        let pk = kp.public_key();
        let bytes = hex::decode(pk.to_hex()).unwrap();
        assert_eq!(PublicKey::try_from_slice(&bytes).unwrap(), pk);
    }

    #[test]
    fn public_key_json_is_base64() {
        let pk = PublicKey::from_bytes([7u8; 32]);
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json, format!("\"{}\"", BASE64.encode([7u8; 32])));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn signature_json_rejects_short_payload() {
        let json = format!("\"{}\"", BASE64.encode([1u8; 10]));
        assert!(serde_json::from_str::<RawSignature>(&json).is_err());
    }

    #[test]
    fn deterministic_from_seed() {
        let a = OasisKeypair::from_seed(&[42u8; 32]);
        let b = OasisKeypair::from_seed(&[42u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"msg"), b.sign(b"msg"));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = OasisKeypair::from_seed(&[9u8; 32]);
        let dbg = format!("{:?}", kp);
        assert!(dbg.starts_with("OasisKeypair(pub="));
        assert!(!dbg.contains(&hex::encode(kp.secret_key_bytes())));
    }
}
