//! Health check handler

use axum::{extract::State, Json};
use sqlx::PgPool;

/// Health check response
#[derive(serde::Serialize)]
pub struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// GET /health - Service and database status
pub async fn health_check(State(pool): State<PgPool>) -> Json<HealthResponse> {
    let database = match crate::db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            "error".to_string()
        }
    };

    let status = if database == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
