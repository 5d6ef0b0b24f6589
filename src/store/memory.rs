//! In-memory identity store for tests and local development
//!
//! Mirrors the conditional-update semantics of the Postgres store: the
//! mutex is held across each read-check-write, so consume/swap are atomic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{IdentityRecord, NonceState};

use super::{IdentityStore, StoreError};

#[derive(Default)]
pub struct MemoryIdentityStore {
    records: Mutex<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, IdentityRecord>>, StoreError>
    {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get(&self, public_key: &str) -> Result<Option<IdentityRecord>, StoreError> {
        Ok(self.lock()?.get(public_key).cloned())
    }

    async fn put(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        self.lock()?
            .insert(record.public_key.clone(), record.clone());
        Ok(())
    }

    async fn set_nonce(
        &self,
        public_key: &str,
        state: &NonceState,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        let record = records
            .entry(public_key.to_string())
            .or_insert_with(|| IdentityRecord::new(public_key, now));
        record.nonce = state.clone();
        record.updated_at = now;
        Ok(())
    }

    async fn consume_nonce(
        &self,
        public_key: &str,
        expected_value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut records = self.lock()?;
        let Some(record) = records.get_mut(public_key) else {
            return Ok(false);
        };
        match &record.nonce {
            NonceState::Pending { value, .. } if value == expected_value => {
                record.nonce = NonceState::Consumed;
                record.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_refresh_token(
        &self,
        public_key: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        let record = records
            .entry(public_key.to_string())
            .or_insert_with(|| IdentityRecord::new(public_key, now));
        record.refresh_token_hash = Some(new_hash.to_string());
        record.updated_at = now;
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        public_key: &str,
        expected_current: Option<&str>,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut records = self.lock()?;
        let Some(record) = records.get_mut(public_key) else {
            return Ok(false);
        };
        if record.refresh_token_hash.as_deref() != expected_current {
            return Ok(false);
        }
        record.refresh_token_hash = Some(new_hash.to_string());
        record.updated_at = now;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_nonce_creates_record() {
        let store = MemoryIdentityStore::new();
        let now = Utc::now();
        let state = NonceState::Pending {
            value: "abc".to_string(),
            issued_at: now,
        };

        store.set_nonce("pk1", &state, now).await.unwrap();

        let record = store.get("pk1").await.unwrap().unwrap();
        assert_eq!(record.nonce.pending_value(), Some("abc"));
        assert!(record.refresh_token_hash.is_none());
    }

    #[tokio::test]
    async fn test_consume_nonce_is_single_use() {
        let store = MemoryIdentityStore::new();
        let now = Utc::now();
        let state = NonceState::Pending {
            value: "abc".to_string(),
            issued_at: now,
        };
        store.set_nonce("pk1", &state, now).await.unwrap();

        assert!(store.consume_nonce("pk1", "abc", now).await.unwrap());
        // Second consumption loses the compare-and-swap
        assert!(!store.consume_nonce("pk1", "abc", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_nonce_wrong_value() {
        let store = MemoryIdentityStore::new();
        let now = Utc::now();
        let state = NonceState::Pending {
            value: "abc".to_string(),
            issued_at: now,
        };
        store.set_nonce("pk1", &state, now).await.unwrap();

        assert!(!store.consume_nonce("pk1", "other", now).await.unwrap());
        assert!(!store.consume_nonce("missing", "abc", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_swap_refresh_token_requires_expected_value() {
        let store = MemoryIdentityStore::new();
        let now = Utc::now();
        store
            .put(&IdentityRecord::new("pk1", now))
            .await
            .unwrap();

        // First issuance: no current token
        assert!(store
            .swap_refresh_token("pk1", None, "hash-a", now)
            .await
            .unwrap());
        // Rotation conditioned on the current hash
        assert!(store
            .swap_refresh_token("pk1", Some("hash-a"), "hash-b", now)
            .await
            .unwrap());
        // Stale expectation fails
        assert!(!store
            .swap_refresh_token("pk1", Some("hash-a"), "hash-c", now)
            .await
            .unwrap());

        let record = store.get("pk1").await.unwrap().unwrap();
        assert_eq!(record.refresh_token_hash.as_deref(), Some("hash-b"));
    }
}
