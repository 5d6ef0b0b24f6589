//! Data models for the WalletGate credential service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Per-identity challenge nonce state.
///
/// A nonce is single-use: it is `Pending` from issuance until redemption,
/// `Consumed` afterwards. Redeeming a `Consumed` or `Unissued` nonce is
/// always rejected, which closes the replay window between issuance and
/// expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceState {
    Unissued,
    Pending {
        value: String,
        issued_at: DateTime<Utc>,
    },
    Consumed,
}

impl NonceState {
    /// The pending nonce value, if any.
    pub fn pending_value(&self) -> Option<&str> {
        match self {
            NonceState::Pending { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Identity record, one per wallet public key.
///
/// `refresh_token_hash` holds the SHA-256 of the single currently-valid
/// refresh token; issuing or rotating overwrites it, which invalidates the
/// previous token. Records are never deleted by this service.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub public_key: String,
    pub nonce: NonceState,
    pub refresh_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    /// A fresh record for a key seen for the first time.
    pub fn new(public_key: &str, now: DateTime<Utc>) -> Self {
        Self {
            public_key: public_key.to_string(),
            nonce: NonceState::Unissued,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Access/refresh token pair bound to one identity.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request for a nonce challenge
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NonceRequest {
    #[validate(length(min = 1, message = "missing public key"))]
    pub public_key: String,
}

/// Response containing the nonce challenge value.
///
/// The encrypted carrier travels separately as an http-only cookie.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceResponse {
    pub nonce: String,
}

/// Request to exchange a signed challenge for tokens
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "missing public key"))]
    pub public_key: String,
    #[validate(length(min = 1, message = "missing signature"))]
    pub signature: String,
    #[validate(length(min = 1, message = "missing nonce"))]
    pub nonce: String,
    #[validate(length(min = 1, message = "missing timestamp"))]
    pub iso_timestamp: String,
}

/// Response carrying a fresh access token.
///
/// The refresh token travels separately as an http-only cookie.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Public profile fields returned by whoami
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmIResponse {
    pub public_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<IdentityRecord> for WhoAmIResponse {
    fn from(record: IdentityRecord) -> Self {
        Self {
            public_key: record.public_key,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
