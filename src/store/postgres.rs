//! PostgreSQL identity store
//!
//! Conditional updates (`consume_nonce`, `swap_refresh_token`) are single
//! UPDATE statements with the expected value in the WHERE clause, so the
//! database enforces the compare-and-swap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{IdentityRecord, NonceState};

use super::{IdentityStore, StoreError};

const STATE_UNISSUED: &str = "unissued";
const STATE_PENDING: &str = "pending";
const STATE_CONSUMED: &str = "consumed";

/// Identity store backed by the `identities` table.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row shape of the `identities` table; nonce state is split across three
/// columns and folded back into [`NonceState`].
#[derive(sqlx::FromRow)]
struct IdentityRow {
    public_key: String,
    nonce_state: String,
    nonce_value: Option<String>,
    nonce_issued_at: Option<DateTime<Utc>>,
    refresh_token_hash: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_record(self) -> IdentityRecord {
        let nonce = match (self.nonce_state.as_str(), self.nonce_value, self.nonce_issued_at) {
            (STATE_PENDING, Some(value), Some(issued_at)) => {
                NonceState::Pending { value, issued_at }
            }
            (STATE_CONSUMED, _, _) => NonceState::Consumed,
            _ => NonceState::Unissued,
        };
        IdentityRecord {
            public_key: self.public_key,
            nonce,
            refresh_token_hash: self.refresh_token_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn nonce_columns(state: &NonceState) -> (&'static str, Option<&str>, Option<DateTime<Utc>>) {
    match state {
        NonceState::Unissued => (STATE_UNISSUED, None, None),
        NonceState::Pending { value, issued_at } => (STATE_PENDING, Some(value), Some(*issued_at)),
        NonceState::Consumed => (STATE_CONSUMED, None, None),
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn get(&self, public_key: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let row: Option<IdentityRow> = sqlx::query_as(
            r#"
            SELECT public_key, nonce_state, nonce_value, nonce_issued_at,
                   refresh_token_hash, created_at, updated_at
            FROM identities
            WHERE public_key = $1
            "#,
        )
        .bind(public_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(IdentityRow::into_record))
    }

    async fn put(&self, record: &IdentityRecord) -> Result<(), StoreError> {
        let (state, value, issued_at) = nonce_columns(&record.nonce);

        sqlx::query(
            r#"
            INSERT INTO identities
                (public_key, nonce_state, nonce_value, nonce_issued_at,
                 refresh_token_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (public_key) DO UPDATE
            SET nonce_state = EXCLUDED.nonce_state,
                nonce_value = EXCLUDED.nonce_value,
                nonce_issued_at = EXCLUDED.nonce_issued_at,
                refresh_token_hash = EXCLUDED.refresh_token_hash,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&record.public_key)
        .bind(state)
        .bind(value)
        .bind(issued_at)
        .bind(&record.refresh_token_hash)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_nonce(
        &self,
        public_key: &str,
        state: &NonceState,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let (state, value, issued_at) = nonce_columns(state);

        sqlx::query(
            r#"
            INSERT INTO identities
                (public_key, nonce_state, nonce_value, nonce_issued_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (public_key) DO UPDATE
            SET nonce_state = EXCLUDED.nonce_state,
                nonce_value = EXCLUDED.nonce_value,
                nonce_issued_at = EXCLUDED.nonce_issued_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(public_key)
        .bind(state)
        .bind(value)
        .bind(issued_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume_nonce(
        &self,
        public_key: &str,
        expected_value: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE identities
            SET nonce_state = $1, nonce_value = NULL, nonce_issued_at = NULL, updated_at = $2
            WHERE public_key = $3 AND nonce_state = $4 AND nonce_value = $5
            "#,
        )
        .bind(STATE_CONSUMED)
        .bind(now)
        .bind(public_key)
        .bind(STATE_PENDING)
        .bind(expected_value)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }

    async fn set_refresh_token(
        &self,
        public_key: &str,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO identities (public_key, refresh_token_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (public_key) DO UPDATE
            SET refresh_token_hash = EXCLUDED.refresh_token_hash,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(public_key)
        .bind(new_hash)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        public_key: &str,
        expected_current: Option<&str>,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // IS NOT DISTINCT FROM makes the expected-value check NULL-aware
        let rows_affected = sqlx::query(
            r#"
            UPDATE identities
            SET refresh_token_hash = $1, updated_at = $2
            WHERE public_key = $3 AND refresh_token_hash IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(new_hash)
        .bind(now)
        .bind(public_key)
        .bind(expected_current)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected == 1)
    }
}
