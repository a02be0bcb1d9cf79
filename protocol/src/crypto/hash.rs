//! # Hashing Utilities
//!
//! Oasis hashes everything with SHA-512/256: the SHA-512 compression
//! function with a distinct IV, truncated to 32 bytes. It is what the chain
//! uses for transaction hashes and for address derivation, so it is the only
//! hash this crate needs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;

/// Digest length of SHA-512/256 in bytes.
pub const HASH_LENGTH: usize = 32;

/// A 32-byte SHA-512/256 digest.
///
/// Displayed and serialized as lowercase hex, which is the form Rosetta
/// callers see as a transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_LENGTH]);

impl Hash {
    /// Hash a single byte string.
    pub fn digest(data: &[u8]) -> Self {
        Self::digest_parts(&[data])
    }

    /// Hash the concatenation of several byte strings without allocating
    /// the concatenation.
    pub fn digest_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha512_256::new();
        for part in parts {
            hasher.update(part);
        }
        let mut output = [0u8; HASH_LENGTH];
        output.copy_from_slice(&hasher.finalize());
        Self(output)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_LENGTH] {
        &self.0
    }

    /// The first `n` bytes of the digest. `n` is clamped to the digest length.
    pub fn truncate(&self, n: usize) -> &[u8] {
        &self.0[..n.min(HASH_LENGTH)]
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; HASH_LENGTH] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_known_vector() {
        // FIPS 180-4 SHA-512/256 of the empty string.
        assert_eq!(
            Hash::digest(b"").to_hex(),
            "c672b8d1ef56ed28ab87c3622c5114069bdd3ad7b8f9737498d0c01ecef0967a"
        );
    }

    #[test]
    fn abc_known_vector() {
        assert_eq!(
            Hash::digest(b"abc").to_hex(),
            "53048e2681941ef99b2e29b76b4c7dabe4c2d0c634fc6d46e0e2f13107e7af23"
        );
    }

    #[test]
    fn parts_match_concatenation() {
        let joined = Hash::digest(b"oasis-core/address: staking\x00key");
        let parts = Hash::digest_parts(&[&b"oasis-core/address: staking"[..], &[0u8][..], &b"key"[..]]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn truncate_is_prefix() {
        let h = Hash::digest(b"prefix");
        assert_eq!(h.truncate(20), &h.as_bytes()[..20]);
        assert_eq!(h.truncate(100).len(), HASH_LENGTH);
    }

    #[test]
    fn serde_roundtrip_as_hex() {
        let h = Hash::digest(b"tx");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
