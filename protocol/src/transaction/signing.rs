//! The signing pipeline: payload preparation, combine, open and hash.
//!
//! Signing happens outside the gateway. The gateway hands out the exact
//! bytes to sign ([`prepare_signing_payload`]), later glues the detached
//! signature back onto the transaction ([`combine`]), and can check and
//! unwrap the result again ([`SignedTransaction::open`]).
//!
//! The signed envelope keeps the canonical transaction bytes verbatim in
//! `blob`, so the signature always covers exactly what was signed even if
//! this gateway's encoder changes later.

use minicbor::{decode, encode, Decoder, Encoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::codec::base64_bytes;
use super::types::Transaction;
use crate::cbor::{self, decode_struct_map, CborError};
use crate::crypto::{self, prepare_signer_message, Hash, PublicKey, RawSignature, SignatureError};

/// Errors from the signing pipeline.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("expected exactly one signature, got {0}")]
    SignatureCount(usize),

    #[error("signature check failed: {0}")]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Cbor(#[from] CborError),
}

/// A detached signature together with the key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub public_key: PublicKey,
    pub signature: RawSignature,
}

/// A transaction blob plus the signature over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    #[serde(rename = "untrusted_raw_value", with = "base64_bytes")]
    pub blob: Vec<u8>,
    pub signature: Signature,
}

/// The byte string an external signer must sign for `tx`:
/// `context || canonical_cbor(tx)`.
pub fn prepare_signing_payload(context: &str, tx: &Transaction) -> Result<Vec<u8>, CborError> {
    Ok(prepare_signer_message(context, &tx.to_cbor()?))
}

/// Attach a detached signature to an unsigned transaction.
///
/// Exactly one signature is accepted. The key is not checked against any
/// address here; [`SignedTransaction::open`] is where the signature is
/// actually verified.
pub fn combine(tx: &Transaction, signatures: &[Signature]) -> Result<SignedTransaction, SigningError> {
    let signature = match signatures {
        [single] => *single,
        other => return Err(SigningError::SignatureCount(other.len())),
    };
    Ok(SignedTransaction {
        blob: tx.to_cbor()?,
        signature,
    })
}

impl SignedTransaction {
    /// Verify the signature over `blob` under `context`, then decode it.
    /// Returns the transaction and the key that signed it.
    pub fn open(&self, context: &str) -> Result<(Transaction, PublicKey), SigningError> {
        crypto::verify(
            &self.signature.public_key,
            context,
            &self.blob,
            &self.signature.signature,
        )?;
        let tx = cbor::decode_exact(&self.blob)?;
        Ok((tx, self.signature.public_key))
    }

    /// Canonical CBOR of the whole envelope.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CborError> {
        cbor::to_vec(self)
    }

    /// Transaction identifier: SHA-512/256 over the canonical envelope.
    pub fn hash(&self) -> Result<Hash, CborError> {
        Ok(Hash::digest(&self.to_cbor()?))
    }
}

impl<C> encode::Encode<C> for Signature {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(2)?;
        e.str("signature")?.bytes(self.signature.as_bytes())?;
        e.str("public_key")?.bytes(self.public_key.as_bytes())?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for Signature {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut signature = None;
        let mut public_key = None;
        decode_struct_map(d, &["signature", "public_key"], |key, d| {
            let bytes = d.bytes()?;
            match key {
                "signature" => {
                    signature =
                        Some(RawSignature::try_from_slice(bytes).map_err(decode::Error::message)?)
                }
                _ => {
                    public_key =
                        Some(PublicKey::try_from_slice(bytes).map_err(decode::Error::message)?)
                }
            }
            Ok(())
        })?;
        match (public_key, signature) {
            (Some(public_key), Some(signature)) => Ok(Self {
                public_key,
                signature,
            }),
            _ => Err(decode::Error::message("incomplete signature")),
        }
    }
}

impl<C> encode::Encode<C> for SignedTransaction {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(2)?;
        e.str("signature")?.encode_with(self.signature, ctx)?;
        e.str("untrusted_raw_value")?.bytes(&self.blob)?;
        Ok(())
    }
}

impl<'b, C> decode::Decode<'b, C> for SignedTransaction {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut C) -> Result<Self, decode::Error> {
        let mut signature = None;
        let mut blob = None;
        decode_struct_map(d, &["signature", "untrusted_raw_value"], |key, d| {
            match key {
                "signature" => signature = Some(d.decode()?),
                _ => blob = Some(d.bytes()?.to_vec()),
            }
            Ok(())
        })?;
        match (blob, signature) {
            (Some(blob), Some(signature)) => Ok(Self { blob, signature }),
            _ => Err(decode::Error::message("incomplete signed transaction")),
        }
    }
}
