//! Identity store abstraction
//!
//! The credential lifecycle engine only needs a narrow interface over the
//! persistent identity records: get/put plus two conditional updates that
//! act as the concurrency boundary (nonce consumption and refresh-token
//! rotation). Everything durable lives here, keyed by public key, so the
//! request handlers themselves stay stateless.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{IdentityRecord, NonceState};

mod memory;
mod postgres;

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

/// Store errors are transient infrastructure failures; callers map them to
/// a 500 and may retry with backoff.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store operation failed: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<StoreError> for crate::error::ApiError {
    fn from(e: StoreError) -> Self {
        crate::error::ApiError::StoreUnavailable(e.to_string())
    }
}

/// Interface the credential lifecycle engine needs from the identity store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fetch a record by public key.
    async fn get(&self, public_key: &str) -> Result<Option<IdentityRecord>, StoreError>;

    /// Upsert a full record.
    async fn put(&self, record: &IdentityRecord) -> Result<(), StoreError>;

    /// Set the nonce state for an identity, creating the record if this is
    /// the first time the key has been seen.
    async fn set_nonce(
        &self,
        public_key: &str,
        state: &NonceState,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Transition `Pending(expected_value)` to `Consumed`.
    ///
    /// Returns `false` when the precondition no longer holds (already
    /// consumed, superseded, or never issued); the caller treats that as a
    /// replay.
    async fn consume_nonce(
        &self,
        public_key: &str,
        expected_value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Overwrite the stored refresh-token hash unconditionally.
    ///
    /// Used on first issuance: signing in always supersedes (and thereby
    /// invalidates) whatever refresh token was current before.
    async fn set_refresh_token(
        &self,
        public_key: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Compare-and-swap the stored refresh-token hash.
    ///
    /// The swap only applies while the stored hash still equals
    /// `expected_current` (`None` = no token issued yet). Returns `false`
    /// when the precondition fails, which means a concurrent rotation won
    /// the race.
    async fn swap_refresh_token(
        &self,
        public_key: &str,
        expected_current: Option<&str>,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
