//! Liveness and readiness probes.

use crate::constants::READINESS_TIMEOUT_SECS;
use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub(super) struct ReadinessResponse {
    pub status: String,
    pub database: String,
}

/// Process is up; no dependency is touched.
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Ready when the database answers `SELECT 1` within the timeout.
pub async fn readiness_check(state: Arc<AppState>) -> impl IntoResponse {
    let timeout = Duration::from_secs(READINESS_TIMEOUT_SECS);

    let database = match tokio::time::timeout(
        timeout,
        sqlx::query("SELECT 1").execute(&state.db.pool),
    )
    .await
    {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database readiness check failed");
            Some(format!("not_ready: {}", e))
        }
        Err(_) => {
            tracing::error!("Database readiness check timed out");
            Some("timeout".to_string())
        }
    };

    match database {
        None => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                database: "ready".to_string(),
            }),
        ),
        Some(database) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                database,
            }),
        ),
    }
}
