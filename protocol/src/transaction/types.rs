//! Core consensus transaction types and their canonical CBOR form.
//!
//! Every `Encode` impl below writes map keys in canonical order (shorter key
//! first, then bytewise), so the bytes are stable no matter how a value was
//! produced. Decoders go through [`decode_struct_map`] and are strict about
//! unknown, duplicate and missing fields.

use minicbor::{decode, encode, Decoder, Encoder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cbor::{self, decode_struct_map, raw_item, CborError};
use crate::staking::{Address, Quantity};

fn missing_field(name: &str) -> decode::Error {
    decode::Error::message(format!("missing field `{}`", name))
}

// ---------------------------------------------------------------------------
// MethodName
// ---------------------------------------------------------------------------

/// Consensus method a transaction invokes.
///
/// Names the gateway does not know are kept verbatim in [`MethodName::Other`]
/// so a foreign transaction still decodes and can be reported as unsupported
/// instead of malformed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodName {
    Transfer,
    Burn,
    AddEscrow,
    ReclaimEscrow,
    Other(String),
}

impl MethodName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Transfer => "staking.Transfer",
            Self::Burn => "staking.Burn",
            Self::AddEscrow => "staking.AddEscrow",
            Self::ReclaimEscrow => "staking.ReclaimEscrow",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for MethodName {
    fn from(s: &str) -> Self {
        match s {
            "staking.Transfer" => Self::Transfer,
            "staking.Burn" => Self::Burn,
            "staking.AddEscrow" => Self::AddEscrow,
            "staking.ReclaimEscrow" => Self::ReclaimEscrow,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MethodName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MethodName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

impl<C> encode::Encode<C> for MethodName {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.str(self.as_str())?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for MethodName {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        Ok(Self::from(d.str()?))
    }
}

// ---------------------------------------------------------------------------
// Fee
// ---------------------------------------------------------------------------

/// Transaction fee: the amount paid and the gas limit it buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Quantity,
    pub gas: u64,
}

impl<C> encode::Encode<C> for Fee {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(2)?;
        e.str("gas")?.u64(self.gas)?;
        e.str("amount")?.encode_with(&self.amount, ctx)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Fee {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut gas = None;
        let mut amount = None;
        decode_struct_map(d, &["gas", "amount"], |key, d| {
            match key {
                "gas" => gas = Some(d.u64()?),
                _ => amount = Some(d.decode()?),
            }
            Ok(())
        })?;
        Ok(Self {
            amount: amount.ok_or_else(|| missing_field("amount"))?,
            gas: gas.ok_or_else(|| missing_field("gas"))?,
        })
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// An unsigned consensus transaction.
///
/// `body` holds the canonical CBOR of the method-specific record exactly as
/// it will be embedded; an empty body is omitted from the encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub fee: Option<Fee>,
    pub method: MethodName,
    pub body: Vec<u8>,
}

impl Transaction {
    /// Assemble a transaction around a typed method body.
    pub fn new<B: MethodBody>(nonce: u64, fee: Option<Fee>, body: &B) -> Result<Self, CborError> {
        Ok(Self {
            nonce,
            fee,
            method: B::METHOD,
            body: cbor::to_vec(body)?,
        })
    }

    /// Decode the embedded body as `B`.
    pub fn decode_body<B: MethodBody>(&self) -> Result<B, CborError> {
        cbor::decode_exact(&self.body)
    }

    /// Canonical CBOR bytes. This is what gets signed and hashed.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CborError> {
        cbor::to_vec(self)
    }
}

impl<C> encode::Encode<C> for Transaction {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        let len = 2 + u64::from(self.fee.is_some()) + u64::from(!self.body.is_empty());
        e.map(len)?;
        if let Some(fee) = &self.fee {
            e.str("fee")?.encode_with(fee, ctx)?;
        }
        if !self.body.is_empty() {
            e.str("body")?;
            e.writer_mut()
                .write_all(&self.body)
                .map_err(encode::Error::write)?;
        }
        e.str("nonce")?.u64(self.nonce)?;
        e.str("method")?.encode_with(&self.method, ctx)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Transaction {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut fee = None;
        let mut body = Vec::new();
        let mut nonce = None;
        let mut method = None;
        decode_struct_map(d, &["fee", "body", "nonce", "method"], |key, d| {
            match key {
                "fee" => fee = Some(d.decode()?),
                "body" => body = raw_item(d)?.to_vec(),
                "nonce" => nonce = Some(d.u64()?),
                _ => method = Some(d.decode()?),
            }
            Ok(())
        })?;
        Ok(Self {
            nonce: nonce.ok_or_else(|| missing_field("nonce"))?,
            fee,
            method: method.ok_or_else(|| missing_field("method"))?,
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Method bodies
// ---------------------------------------------------------------------------

/// A typed method body tied to the method name that carries it.
pub trait MethodBody: encode::Encode<()> + for<'b> decode::Decode<'b, ()> {
    const METHOD: MethodName;
}

/// `staking.Transfer`: move tokens from the signer's general balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub to: Address,
    pub tokens: Quantity,
}

/// `staking.Burn`: destroy tokens from the signer's general balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burn {
    pub tokens: Quantity,
}

/// `staking.AddEscrow`: delegate tokens into an escrow pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escrow {
    pub account: Address,
    pub tokens: Quantity,
}

/// `staking.ReclaimEscrow`: redeem pool shares back into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimEscrow {
    pub account: Address,
    pub shares: Quantity,
}

impl MethodBody for Transfer {
    const METHOD: MethodName = MethodName::Transfer;
}

impl MethodBody for Burn {
    const METHOD: MethodName = MethodName::Burn;
}

impl MethodBody for Escrow {
    const METHOD: MethodName = MethodName::AddEscrow;
}

impl MethodBody for ReclaimEscrow {
    const METHOD: MethodName = MethodName::ReclaimEscrow;
}

impl<C> encode::Encode<C> for Transfer {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(2)?;
        e.str("to")?.encode_with(self.to, ctx)?;
        e.str("tokens")?.encode_with(&self.tokens, ctx)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Transfer {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut to = None;
        let mut tokens = None;
        decode_struct_map(d, &["to", "tokens"], |key, d| {
            match key {
                "to" => to = Some(d.decode()?),
                _ => tokens = Some(d.decode()?),
            }
            Ok(())
        })?;
        Ok(Self {
            to: to.ok_or_else(|| missing_field("to"))?,
            tokens: tokens.ok_or_else(|| missing_field("tokens"))?,
        })
    }
}

impl<C> encode::Encode<C> for Burn {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(1)?;
        e.str("tokens")?.encode_with(&self.tokens, ctx)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Burn {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut tokens = None;
        decode_struct_map(d, &["tokens"], |_, d| {
            tokens = Some(d.decode()?);
            Ok(())
        })?;
        Ok(Self {
            tokens: tokens.ok_or_else(|| missing_field("tokens"))?,
        })
    }
}

impl<C> encode::Encode<C> for Escrow {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(2)?;
        e.str("tokens")?.encode_with(&self.tokens, ctx)?;
        e.str("account")?.encode_with(self.account, ctx)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Escrow {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut tokens = None;
        let mut account = None;
        decode_struct_map(d, &["tokens", "account"], |key, d| {
            match key {
                "tokens" => tokens = Some(d.decode()?),
                _ => account = Some(d.decode()?),
            }
            Ok(())
        })?;
        Ok(Self {
            account: account.ok_or_else(|| missing_field("account"))?,
            tokens: tokens.ok_or_else(|| missing_field("tokens"))?,
        })
    }
}

impl<C> encode::Encode<C> for ReclaimEscrow {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(2)?;
        e.str("shares")?.encode_with(&self.shares, ctx)?;
        e.str("account")?.encode_with(self.account, ctx)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for ReclaimEscrow {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut shares = None;
        let mut account = None;
        decode_struct_map(d, &["shares", "account"], |key, d| {
            match key {
                "shares" => shares = Some(d.decode()?),
                _ => account = Some(d.decode()?),
            }
            Ok(())
        })?;
        Ok(Self {
            account: account.ok_or_else(|| missing_field("account"))?,
            shares: shares.ok_or_else(|| missing_field("shares"))?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PublicKey;

    fn addr(byte: u8) -> Address {
        Address::from_public_key(&PublicKey::from_bytes([byte; 32]))
    }

    #[test]
    fn method_names_roundtrip_through_text() {
        for m in [
            MethodName::Transfer,
            MethodName::Burn,
            MethodName::AddEscrow,
            MethodName::ReclaimEscrow,
        ] {
            assert_eq!(MethodName::from(m.as_str()), m);
        }
        assert_eq!(
            MethodName::from("registry.RegisterEntity"),
            MethodName::Other("registry.RegisterEntity".into())
        );
    }

    #[test]
    fn burn_body_exact_bytes() {
        let body = Burn {
            tokens: Quantity::from(50u64),
        };
        // {"tokens": h'32'}
        let expected = [0xa1, 0x66, b't', b'o', b'k', b'e', b'n', b's', 0x41, 0x32];
        assert_eq!(cbor::to_vec(&body).unwrap(), expected);
    }

    #[test]
    fn transaction_exact_bytes() {
        let tx = Transaction::new(
            5,
            Some(Fee {
                amount: Quantity::from(10u64),
                gas: 20_000,
            }),
            &Burn {
                tokens: Quantity::from(50u64),
            },
        )
        .unwrap();

        let mut expected = vec![0xa4];
        // "fee": {"gas": 20000, "amount": h'0a'}
        expected.extend_from_slice(&[0x63, b'f', b'e', b'e', 0xa2]);
        expected.extend_from_slice(&[0x63, b'g', b'a', b's', 0x19, 0x4e, 0x20]);
        expected.extend_from_slice(&[0x66, b'a', b'm', b'o', b'u', b'n', b't', 0x41, 0x0a]);
        // "body": {"tokens": h'32'}
        expected.extend_from_slice(&[0x64, b'b', b'o', b'd', b'y']);
        expected.extend_from_slice(&[0xa1, 0x66, b't', b'o', b'k', b'e', b'n', b's', 0x41, 0x32]);
        // "nonce": 5
        expected.extend_from_slice(&[0x65, b'n', b'o', b'n', b'c', b'e', 0x05]);
        // "method": "staking.Burn"
        expected.extend_from_slice(&[0x66, b'm', b'e', b't', b'h', b'o', b'd', 0x6c]);
        expected.extend_from_slice(b"staking.Burn");

        assert_eq!(tx.to_cbor().unwrap(), expected);
        let back: Transaction = cbor::decode_exact(&expected).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn empty_fee_and_body_are_omitted() {
        let tx = Transaction {
            nonce: 0,
            fee: None,
            method: MethodName::Other("x".into()),
            body: Vec::new(),
        };
        let bytes = tx.to_cbor().unwrap();
        assert_eq!(bytes[0], 0xa2);
        let back: Transaction = cbor::decode_exact(&bytes).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn transfer_and_escrow_bodies_decode() {
        let transfer = Transfer {
            to: addr(1),
            tokens: Quantity::from(100u64),
        };
        let tx = Transaction::new(1, None, &transfer).unwrap();
        assert_eq!(tx.method, MethodName::Transfer);
        assert_eq!(tx.decode_body::<Transfer>().unwrap(), transfer);

        let escrow = Escrow {
            account: addr(2),
            tokens: Quantity::from(7u64),
        };
        let tx = Transaction::new(1, None, &escrow).unwrap();
        assert_eq!(tx.method, MethodName::AddEscrow);
        assert_eq!(tx.decode_body::<Escrow>().unwrap(), escrow);

        let reclaim = ReclaimEscrow {
            account: addr(3),
            shares: Quantity::from(30u64),
        };
        let tx = Transaction::new(1, None, &reclaim).unwrap();
        assert_eq!(tx.method, MethodName::ReclaimEscrow);
        assert_eq!(tx.decode_body::<ReclaimEscrow>().unwrap(), reclaim);
    }

    #[test]
    fn body_of_wrong_kind_fails() {
        let tx = Transaction::new(
            1,
            None,
            &Burn {
                tokens: Quantity::from(1u64),
            },
        )
        .unwrap();
        assert!(tx.decode_body::<Transfer>().is_err());
    }

    #[test]
    fn missing_required_field_fails() {
        // {"nonce": 1}
        let bytes = [0xa1, 0x65, b'n', b'o', b'n', b'c', b'e', 0x01];
        assert!(cbor::decode_exact::<Transaction>(&bytes).is_err());
    }
}
