//! Staking account addresses.
//!
//! An address is derived from an entity's Ed25519 public key:
//!
//! ```text
//! public key (32 bytes)
//!     -> SHA-512/256("oasis-core/address: staking" || version || key)
//!     -> version || first 20 bytes of the digest       (21 bytes)
//!     -> Bech32("oasis", ...)                           oasis1qz8z2pgn...
//! ```
//!
//! The derivation is one-way and deterministic. Bech32 gives the text form a
//! checksum, so a fat-fingered address fails to parse instead of silently
//! pointing somewhere else.

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use minicbor::{decode, encode, Decoder, Encoder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{
    ADDRESS_CONTEXT, ADDRESS_HASH_LENGTH, ADDRESS_HRP, ADDRESS_LENGTH, ADDRESS_VERSION,
};
use crate::crypto::{Hash, PublicKey};

const HRP: Hrp = Hrp::parse_unchecked(ADDRESS_HRP);

/// Errors that can occur while decoding an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The text could not be decoded as Bech32.
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    /// The decoded address has an unexpected human-readable prefix.
    #[error("invalid HRP: expected '{expected}', got '{0}'", expected = ADDRESS_HRP)]
    InvalidHrp(String),

    /// The decoded payload has the wrong size.
    #[error("invalid address length: expected {expected} bytes, got {0}", expected = ADDRESS_LENGTH)]
    InvalidLength(usize),

    /// The version byte is not one this gateway understands.
    #[error("unsupported address version {0}")]
    UnsupportedVersion(u8),
}

/// A 21-byte staking account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Derive the address controlled by `public_key`.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let digest = Hash::digest_parts(&[
            ADDRESS_CONTEXT,
            &[ADDRESS_VERSION][..],
            &public_key.as_bytes()[..],
        ]);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[0] = ADDRESS_VERSION;
        bytes[1..].copy_from_slice(digest.truncate(ADDRESS_HASH_LENGTH));
        Self(bytes)
    }

    /// Parse the binary form, checking length and version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let arr: [u8; ADDRESS_LENGTH] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        if arr[0] != ADDRESS_VERSION {
            return Err(AddressError::UnsupportedVersion(arr[0]));
        }
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Bech32 text form.
    pub fn to_bech32(&self) -> String {
        // A 21-byte payload under a fixed, valid HRP is always encodable.
        bech32::encode::<Bech32>(HRP, &self.0).unwrap_or_default()
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only the Bech32 checksum is canonical; Bech32m is rejected.
        let checked = CheckedHrpstring::new::<Bech32>(s)
            .map_err(|e| AddressError::Bech32Decode(e.to_string()))?;
        if checked.hrp() != HRP {
            return Err(AddressError::InvalidHrp(checked.hrp().to_string()));
        }
        let data: Vec<u8> = checked.byte_iter().collect();
        Self::from_bytes(&data)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bech32())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_bech32())
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_bech32())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<C> encode::Encode<C> for Address {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Address {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let bytes = d.bytes()?;
        Self::from_bytes(bytes).map_err(decode::Error::message)
    }
}
