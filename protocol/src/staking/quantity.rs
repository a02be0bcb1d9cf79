//! Arbitrary-precision token quantities.
//!
//! Balances, fees and share counts on the staking ledger are unbounded
//! non-negative integers. A [`Quantity`] never carries a sign; whether a
//! value is a debit or a credit is a convention owned by the caller.
//!
//! Wire forms:
//! - CBOR: byte string holding the big-endian magnitude with no leading
//!   zero bytes. Zero is the empty byte string.
//! - JSON: base-10 string, e.g. `"1000000000"`.

use minicbor::{decode, encode, Decoder, Encoder};
use num::{BigInt, BigUint, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors converting into a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("quantity is not a base-10 integer: '{0}'")]
    InvalidDecimal(String),

    #[error("quantity must not be negative: {0}")]
    Negative(BigInt),

    #[error("non-canonical quantity encoding: leading zero byte")]
    LeadingZero,
}

/// A non-negative integer amount of base units.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quantity(BigUint);

impl Quantity {
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }


    /// Minimal big-endian bytes; empty for zero.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        if self.is_zero() {
            Vec::new()
        } else {
            self.0.to_bytes_be()
        }
    }

    /// Parse minimal big-endian bytes.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, QuantityError> {
        if bytes.first() == Some(&0) {
            return Err(QuantityError::LeadingZero);
        }
        Ok(Self(BigUint::from_bytes_be(bytes)))
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Quantity {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl TryFrom<BigInt> for Quantity {
    type Error = QuantityError;

    fn try_from(value: BigInt) -> Result<Self, Self::Error> {
        match value.to_biguint() {
            Some(magnitude) => Ok(Self(magnitude)),
            None => Err(QuantityError::Negative(value)),
        }
    }
}

impl FromStr for Quantity {
    type Err = QuantityError;

    /// Accepts plain base-10 digits only. Signs are the caller's business.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(QuantityError::InvalidDecimal(s.to_string()));
        }
        BigUint::from_str(s)
            .map(Self)
            .map_err(|_| QuantityError::InvalidDecimal(s.to_string()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity({})", self.0)
    }
}

impl Serialize for Quantity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<C> encode::Encode<C> for Quantity {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.to_be_bytes())?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Quantity {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let bytes = d.bytes()?;
        Self::from_be_bytes(bytes).map_err(decode::Error::message)
    }
}
