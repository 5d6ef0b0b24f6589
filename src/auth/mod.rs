//! Authentication module for WalletGate
//!
//! Provides wallet-based authentication for base58 ed25519 public keys:
//! - Challenge-response with single-use encrypted nonce carriers
//! - Signature-based proof-of-ownership
//! - Access/refresh token issuance and rotation with per-identity secrets

mod challenge;
mod nonce;
mod service;
mod signature;
mod token;

pub use challenge::challenge_message;
pub use nonce::{NonceError, NonceManager};
pub use service::{AuthError, AuthService};
pub use signature::{decode_public_key, decode_signature, verify_signature, DecodeError};
pub use token::{hash_token, Claims, TokenError, TokenIssuer, TokenType};
