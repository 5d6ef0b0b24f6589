//! Authentication service
//!
//! The credential lifecycle orchestrator: composes the nonce manager,
//! signature verifier, token issuer, and identity store into the four
//! entry points (request nonce, authenticate, refresh, whoami), applying
//! every precondition and failure check.
//!
//! Handlers are request-scoped and stateless; all durable state lives in
//! the store keyed by public key, and the store's conditional updates are
//! the only concurrency boundary.

use chrono::Utc;
use thiserror::Error;

use crate::error::ApiError;
use crate::models::{IdentityRecord, NonceState, TokenPair};
use crate::store::{IdentityStore, StoreError};

use super::challenge::challenge_message;
use super::nonce::{NonceError, NonceManager};
use super::signature::{decode_public_key, decode_signature, verify_signature, DecodeError};
use super::token::{hash_token, TokenError, TokenIssuer, TokenType};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(#[from] DecodeError),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error("Invalid refresh token")]
    RefreshTokenInvalid,

    #[error("Refresh token is not the current one for this identity")]
    RefreshNotCurrent,

    #[error("Invalid access token")]
    AccessTokenInvalid,

    #[error("Access token expired")]
    AccessTokenExpired,

    #[error("Identity not found")]
    UnknownIdentity,

    #[error("Concurrent rotation detected, retry the refresh")]
    RotationConflict,

    #[error("Token issuance failed: {0}")]
    Issuance(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidPublicKey(msg) => ApiError::InputInvalid(msg),
            AuthError::InvalidSignatureEncoding(err) => ApiError::InputInvalid(err.to_string()),
            AuthError::SignatureInvalid => {
                ApiError::CredentialInvalid("signature verification failed".to_string())
            }
            AuthError::Nonce(NonceError::CarrierInvalid) => {
                ApiError::CredentialInvalid("nonce carrier is missing or invalid".to_string())
            }
            AuthError::Nonce(NonceError::SealFailed(_)) => ApiError::Internal,
            AuthError::Nonce(err) => ApiError::Forbidden(err.to_string()),
            AuthError::RefreshTokenInvalid | AuthError::RefreshNotCurrent => {
                ApiError::Forbidden("invalid refresh token".to_string())
            }
            AuthError::AccessTokenInvalid => {
                ApiError::CredentialInvalid("invalid access token".to_string())
            }
            AuthError::AccessTokenExpired => {
                ApiError::CredentialInvalid("access token expired".to_string())
            }
            AuthError::UnknownIdentity => ApiError::NotFound("identity not found".to_string()),
            AuthError::RotationConflict => {
                ApiError::Conflict("concurrent rotation, retry the refresh".to_string())
            }
            AuthError::Issuance(_) => ApiError::Internal,
            AuthError::Store(err) => ApiError::StoreUnavailable(err.to_string()),
        }
    }
}

/// Credential lifecycle orchestrator.
pub struct AuthService<S> {
    store: S,
    nonces: NonceManager,
    tokens: TokenIssuer,
}

impl<S: IdentityStore> AuthService<S> {
    pub fn new(
        store: S,
        carrier_key: &[u8; 32],
        nonce_ttl_seconds: i64,
        server_secret: String,
        access_token_ttl_seconds: i64,
        refresh_token_ttl_days: i64,
    ) -> Self {
        Self {
            store,
            nonces: NonceManager::new(carrier_key, nonce_ttl_seconds),
            tokens: TokenIssuer::new(
                server_secret,
                access_token_ttl_seconds,
                refresh_token_ttl_days,
            ),
        }
    }

    /// Issue a fresh challenge nonce for a wallet.
    ///
    /// Upserts the identity record with the pending nonce (superseding any
    /// previous one) and returns the nonce value plus the encrypted carrier
    /// the client must present back on login.
    pub async fn request_nonce(&self, public_key: &str) -> Result<(String, String), AuthError> {
        if public_key.is_empty() {
            return Err(AuthError::InvalidPublicKey(
                "public key must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let nonce = self.nonces.generate();
        let carrier = self.nonces.seal(&nonce, now)?;

        let state = NonceState::Pending {
            value: nonce.clone(),
            issued_at: now,
        };
        self.store.set_nonce(public_key, &state, now).await?;

        tracing::debug!(public_key = %public_key, "Issued challenge nonce");

        Ok((nonce, carrier))
    }

    /// Exchange a signed challenge for a token pair.
    ///
    /// The nonce is consumed only after the signature verifies, so a failed
    /// signature leaves the pending nonce redeemable within its window. The
    /// consumption itself is a conditional store update; losing that race
    /// rejects the attempt as a replay.
    pub async fn authenticate(
        &self,
        public_key: &str,
        signature: &str,
        nonce: &str,
        iso_timestamp: &str,
        carrier: Option<&str>,
    ) -> Result<TokenPair, AuthError> {
        let key_bytes = decode_public_key(public_key)
            .map_err(|e| AuthError::InvalidPublicKey(e.to_string()))?;
        let signature_bytes = decode_signature(signature)?;

        let now = Utc::now();
        let record = self.store.get(public_key).await?;
        let state = record.map(|r| r.nonce).unwrap_or(NonceState::Unissued);

        let pending = self.nonces.redeem(&state, nonce, carrier, now)?;

        let message = challenge_message(nonce, public_key, iso_timestamp);
        if !verify_signature(message.as_bytes(), &signature_bytes, &key_bytes) {
            return Err(AuthError::SignatureInvalid);
        }

        if !self.store.consume_nonce(public_key, &pending, now).await? {
            return Err(AuthError::Nonce(NonceError::AlreadyUsed));
        }

        let pair = self
            .tokens
            .mint(public_key)
            .map_err(|e| AuthError::Issuance(e.to_string()))?;
        self.store
            .set_refresh_token(public_key, &hash_token(&pair.refresh_token), now)
            .await?;

        tracing::info!(public_key = %public_key, "Wallet authenticated");

        Ok(pair)
    }

    /// Rotate a refresh token into a new token pair.
    ///
    /// Store-bound policy: the presented token must hash-equal the stored
    /// current one, even when cryptographically valid; an old pre-rotation
    /// token is permanently non-rotatable. The overwrite is a
    /// compare-and-swap so two concurrent refreshes cannot both succeed.
    pub async fn refresh(&self, presented_refresh: &str) -> Result<TokenPair, AuthError> {
        let claims = self
            .tokens
            .verify(presented_refresh, TokenType::Refresh)
            .map_err(|_| AuthError::RefreshTokenInvalid)?;

        let record = self
            .store
            .get(&claims.sub)
            .await?
            .ok_or(AuthError::UnknownIdentity)?;

        let presented_hash = hash_token(presented_refresh);
        let current = record
            .refresh_token_hash
            .as_deref()
            .ok_or(AuthError::RefreshNotCurrent)?;
        if presented_hash != current {
            return Err(AuthError::RefreshNotCurrent);
        }

        let pair = self
            .tokens
            .mint(&claims.sub)
            .map_err(|e| AuthError::Issuance(e.to_string()))?;

        let swapped = self
            .store
            .swap_refresh_token(
                &claims.sub,
                Some(current),
                &hash_token(&pair.refresh_token),
                Utc::now(),
            )
            .await?;
        if !swapped {
            return Err(AuthError::RotationConflict);
        }

        tracing::info!(public_key = %claims.sub, "Refresh token rotated");

        Ok(pair)
    }

    /// Resolve an access token into the identity's public profile record.
    ///
    /// The token check itself is stateless; the store is consulted only for
    /// the profile fields.
    pub async fn whoami(&self, access_token: &str) -> Result<IdentityRecord, AuthError> {
        let subject = self.resolve_access_token(access_token)?;
        self.profile(&subject).await
    }

    /// Look up the public profile record for an already-authorized identity.
    pub async fn profile(&self, public_key: &str) -> Result<IdentityRecord, AuthError> {
        self.store
            .get(public_key)
            .await?
            .ok_or(AuthError::UnknownIdentity)
    }

    /// Stateless access-token resolution for the bearer-auth extractor.
    pub fn resolve_access_token(&self, access_token: &str) -> Result<String, AuthError> {
        self.tokens.resolve(access_token).map_err(|e| match e {
            TokenError::Expired => AuthError::AccessTokenExpired,
            _ => AuthError::AccessTokenInvalid,
        })
    }
}
