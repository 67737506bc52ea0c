//! One-time code endpoints: join codes, claim codes and reset codes.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminSession, ApiJson};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCodeRequest {
    #[serde(default)]
    pub member_id: String,
}

/// GET /api/auth/join-codes
pub async fn count_join_codes(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let active = state.accounts().count_active_join_codes().await?;
    Ok(Json(json!({ "activeCodes": active })))
}

/// POST /api/auth/join-codes
pub async fn generate_join_code(
    State(state): State<AppState>,
    admin: AdminSession,
) -> Result<impl IntoResponse, ApiError> {
    let code = state.accounts().generate_join_code(admin.actor()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "code": code,
            "message": "One-time join code generated. It can be used once."
        })),
    ))
}

/// POST /api/auth/claim-codes
pub async fn issue_claim_code(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<MemberCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.accounts().issue_claim_code(&request.member_id).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}

/// POST /api/auth/reset-codes
pub async fn issue_reset_code(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<MemberCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state.accounts().issue_reset_code(&request.member_id).await?;
    Ok((StatusCode::CREATED, Json(issued)))
}
