//! Ed25519 signature verification
//!
//! Verifies detached wallet signatures over the canonical challenge message.
//! The verifier itself is pure and fails closed: malformed key or signature
//! content returns `false`, never an error. Decoding the base58 wire forms
//! happens at the boundary and reports input errors to the caller instead.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

/// Errors decoding the base58 wire encoding of keys and signatures.
///
/// These are caller-level input errors (400), not verification failures.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Decode a base58 public key into its 32 raw bytes.
pub fn decode_public_key(text: &str) -> Result<[u8; 32], DecodeError> {
    decode_fixed::<32>(text)
}

/// Decode a base58 detached signature into its 64 raw bytes.
pub fn decode_signature(text: &str) -> Result<[u8; 64], DecodeError> {
    decode_fixed::<64>(text)
}

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], DecodeError> {
    let bytes = bs58::decode(text)
        .into_vec()
        .map_err(|e| DecodeError::InvalidBase58(e.to_string()))?;
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| DecodeError::WrongLength {
            expected: N,
            actual,
        })
}

/// Verify a detached ed25519 signature over `message`.
///
/// Returns `false` for any invalid input, including public-key bytes that do
/// not decode to a valid curve point.
pub fn verify_signature(message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let signature = Signature::from_bytes(signature);

    verifying_key.verify(message, &signature).is_ok()
}
