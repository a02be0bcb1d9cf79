//! Canonical CBOR helpers.
//!
//! Every consensus structure is a CBOR map with text keys. Canonical form
//! (RFC 7049 §3.9) orders keys by encoded length first, then bytewise, and
//! uses the shortest integer encodings. `minicbor` already emits minimal
//! integers; the key order is fixed by hand in each `Encode` impl.
//!
//! Decoding is strict: definite-length maps only, no duplicate keys, no
//! unknown keys and no trailing bytes after the top-level item.

use minicbor::decode::{Decode, Decoder, Error as DecodeError};
use minicbor::encode::Encode;
use thiserror::Error;

/// Errors from the canonical codec.
#[derive(Debug, Error)]
pub enum CborError {
    #[error("cbor encode: {0}")]
    Encode(String),

    #[error("cbor decode: {0}")]
    Decode(#[from] DecodeError),

    #[error("trailing bytes after cbor item: {0}")]
    TrailingBytes(usize),
}

/// Encode a value into its canonical byte form.
pub fn to_vec<T: Encode<()>>(value: &T) -> Result<Vec<u8>, CborError> {
    minicbor::to_vec(value).map_err(|e| CborError::Encode(e.to_string()))
}

/// Decode a value, requiring that it spans the whole input.
pub fn decode_exact<'b, T: Decode<'b, ()>>(bytes: &'b [u8]) -> Result<T, CborError> {
    let mut d = Decoder::new(bytes);
    let value = d.decode::<T>()?;
    let rest = bytes.len() - d.position();
    if rest != 0 {
        return Err(CborError::TrailingBytes(rest));
    }
    Ok(value)
}

/// Walk a definite-length map with text keys, handing each `(key, decoder)`
/// to `on_field`. The callback must consume exactly the value.
///
/// Keys outside `known` and repeated keys are rejected.
pub fn decode_struct_map<'b, F>(
    d: &mut Decoder<'b>,
    known: &[&str],
    mut on_field: F,
) -> Result<(), DecodeError>
where
    F: FnMut(&'b str, &mut Decoder<'b>) -> Result<(), DecodeError>,
{
    let len = d
        .map()?
        .ok_or_else(|| DecodeError::message("indefinite-length map"))?;
    if len > known.len() as u64 {
        return Err(DecodeError::message(format!(
            "map has {} entries, at most {} expected",
            len,
            known.len()
        )));
    }
    let mut seen: Vec<&str> = Vec::with_capacity(known.len());
    for _ in 0..len {
        let key = d.str()?;
        if !known.contains(&key) {
            return Err(DecodeError::message(format!("unknown field `{}`", key)));
        }
        if seen.contains(&key) {
            return Err(DecodeError::message(format!("duplicate field `{}`", key)));
        }
        seen.push(key);
        on_field(key, d)?;
    }
    Ok(())
}

/// Capture the raw bytes of the next CBOR item without interpreting them.
pub fn raw_item<'b>(d: &mut Decoder<'b>) -> Result<&'b [u8], DecodeError> {
    let input = d.input();
    let start = d.position();
    d.skip()?;
    Ok(&input[start..d.position()])
}

/// Require `bytes` to be exactly one well-formed CBOR item.
pub fn check_single_item(bytes: &[u8]) -> Result<(), CborError> {
    let mut d = Decoder::new(bytes);
    d.skip()?;
    let rest = bytes.len() - d.position();
    if rest != 0 {
        return Err(CborError::TrailingBytes(rest));
    }
    Ok(())
}
