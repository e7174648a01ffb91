use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::{MemberCode, Side};
use crate::engine::PlacementPreferences;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberRequest {
    /// Referral code of the sponsor. Omitted means company-sponsored;
    /// placement falls back to the root member.
    pub sponsor_code: Option<String>,
    /// "left" or "right".
    pub preferred_side: Option<String>,
    pub overload_penalty: Option<bool>,
    pub career_level_bonus: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMemberResponse {
    pub member_id: i64,
    pub code: String,
    pub parent_id: i64,
    pub side: String,
    pub depth: usize,
}

pub async fn register_member(
    State(state): State<AppState>,
    Json(body): Json<RegisterMemberRequest>,
) -> Result<Json<RegisterMemberResponse>, AppError> {
    let sponsor_code = match body.sponsor_code.as_deref() {
        Some("") | None => None,
        Some(code) => Some(MemberCode::new(code.to_string())),
    };

    let preferred_side = match body.preferred_side.as_deref() {
        Some("") | None => None,
        Some(raw) => Some(parse_side(raw)?),
    };
    let preferences = PlacementPreferences {
        preferred_side,
        overload_penalty: body.overload_penalty.unwrap_or(false),
        career_level_bonus: body.career_level_bonus.unwrap_or(false),
    };

    let result = state
        .registrar
        .register(sponsor_code.as_ref(), &preferences)
        .await?;

    Ok(Json(RegisterMemberResponse {
        member_id: result.member_id.as_i64(),
        code: result.code.as_str().to_string(),
        parent_id: result.placement.parent_id.as_i64(),
        side: result.placement.side.to_string(),
        depth: result.placement.depth,
    }))
}

fn parse_side(raw: &str) -> Result<Side, AppError> {
    Side::parse(raw)
        .ok_or_else(|| AppError::BadRequest(format!("preferredSide must be left or right, got {}", raw)))
}
