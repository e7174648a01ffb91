use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::MemberId;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatsQuery {
    pub member_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatsResponse {
    pub member_id: i64,
    pub left_volume: String,
    pub right_volume: String,
    pub left_count: usize,
    pub right_count: usize,
    pub binary_bonus: String,
    pub next_binary_bonus: String,
}

/// Left/right leg summary and binary bonus projection for one member.
pub async fn get_network_stats(
    Query(params): Query<NetworkStatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<NetworkStatsResponse>, AppError> {
    let member_id = MemberId::new(params.member_id);
    let stats = state.distributor.binary_network_stats(member_id).await?;

    Ok(Json(NetworkStatsResponse {
        member_id: params.member_id,
        left_volume: stats.left_volume.to_canonical_string(),
        right_volume: stats.right_volume.to_canonical_string(),
        left_count: stats.left_count,
        right_count: stats.right_count,
        binary_bonus: stats.binary_bonus.to_canonical_string(),
        next_binary_bonus: stats.next_binary_bonus.to_canonical_string(),
    }))
}
