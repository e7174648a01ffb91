use axum::extract::State;
use axum::Json;
use serde_json::json;

use super::AppState;
use crate::error::AppError;

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": env!("CARGO_PKG_NAME")}))
}

/// Readiness probe. Counts members so a broken database surfaces here
/// instead of on the first real request.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let members = state.repo.count_members().await?;
    Ok(Json(json!({"status": "ready", "members": members})))
}
