//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::config::Config;
use crate::store::PgIdentityStore;

/// The production auth service: orchestrator over the Postgres store.
pub type SharedAuthService = Arc<AuthService<PgIdentityStore>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: SharedAuthService,
    pub db_pool: PgPool,
    /// Whether carrier cookies are marked Secure
    pub cookie_secure: bool,
    /// Refresh-cookie lifetime, mirroring the refresh-token TTL
    pub refresh_token_ttl_days: i64,
}

impl AppState {
    pub fn new(config: &Config, db_pool: PgPool) -> Self {
        let auth_service = Arc::new(AuthService::new(
            PgIdentityStore::new(db_pool.clone()),
            &config.carrier_key,
            config.nonce_ttl_seconds,
            config.server_secret.clone(),
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_days,
        ));

        Self {
            auth_service,
            db_pool,
            cookie_secure: config.cookie_secure,
            refresh_token_ttl_days: config.refresh_token_ttl_days,
        }
    }
}

impl FromRef<AppState> for SharedAuthService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
