use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::Decimal;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributePoolRequest {
    pub total_pool: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributePoolResponse {
    pub recipient_count: usize,
    pub amount_per_member: String,
    pub total_distributed: String,
}

/// Pays out the accumulated passive pool evenly across fully-active
/// members. Zero recipients is a 200 no-op.
pub async fn distribute_pool(
    State(state): State<AppState>,
    Json(body): Json<DistributePoolRequest>,
) -> Result<Json<DistributePoolResponse>, AppError> {
    let result = state
        .distributor
        .distribute_passive_pool(body.total_pool)
        .await?;

    Ok(Json(DistributePoolResponse {
        recipient_count: result.recipient_count,
        amount_per_member: result.amount_per_member.to_canonical_string(),
        total_distributed: result.total_distributed.to_canonical_string(),
    }))
}
