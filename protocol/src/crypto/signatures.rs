//! # Digital Signatures
//!
//! Domain-separated Ed25519 signing and verification.
//!
//! The chain never signs raw messages. Every signed byte string is prefixed
//! with a context string, so a signature produced for a transaction can never
//! be replayed as a signature over some unrelated message that happens to
//! share the same bytes.
//!
//! Verification uses `verify_strict`, which rejects small-order keys and
//! non-canonical signature encodings.

use ed25519_dalek::Signature as DalekSignature;
use thiserror::Error;

use super::keys::{KeyError, PublicKey, RawSignature};

/// Errors during signature verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Build the exact byte sequence covered by a signature:
/// `context || message`.
pub fn prepare_signer_message(context: &str, message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(context.len() + message.len());
    out.extend_from_slice(context.as_bytes());
    out.extend_from_slice(message);
    out
}

/// Verify a detached signature over `message` under `context`.
pub fn verify(
    public_key: &PublicKey,
    context: &str,
    message: &[u8],
    signature: &RawSignature,
) -> Result<(), SignatureError> {
    let verifying_key = public_key.to_verifying_key()?;
    let sig = DalekSignature::from_bytes(signature.as_bytes());
    verifying_key
        .verify_strict(&prepare_signer_message(context, message), &sig)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::OasisKeypair;

    const CTX: &str = "oasis-core/consensus: tx";

    #[test]
    fn signer_message_is_context_then_message() {
        let msg = prepare_signer_message("ctx:", b"body");
        assert_eq!(msg, b"ctx:body");
    }

    #[test]
    fn sign_and_verify() {
        let kp = OasisKeypair::generate();
        let sig = kp.sign(&prepare_signer_message(CTX, b"payload"));
        assert!(verify(&kp.public_key(), CTX, b"payload", &sig).is_ok());
    }

    #[test]
    fn wrong_context_fails() {
        let kp = OasisKeypair::generate();
        let sig = kp.sign(&prepare_signer_message(CTX, b"payload"));
        assert_eq!(
            verify(&kp.public_key(), "other context", b"payload", &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = OasisKeypair::generate();
        let kp2 = OasisKeypair::generate();
        let sig = kp1.sign(&prepare_signer_message(CTX, b"payload"));
        assert!(verify(&kp2.public_key(), CTX, b"payload", &sig).is_err());
    }

    #[test]
    fn tampered_message_fails() {
        let kp = OasisKeypair::generate();
        let sig = kp.sign(&prepare_signer_message(CTX, b"payload"));
        assert!(verify(&kp.public_key(), CTX, b"payloaD", &sig).is_err());
    }

    #[test]
    fn identity_point_is_rejected() {
        // All-zero bytes decode to a small-order point.
        let pk = PublicKey::from_bytes([0u8; 32]);
        let sig = RawSignature::from_bytes([0u8; 64]);
        assert!(verify(&pk, CTX, b"anything", &sig).is_err());
    }
}
