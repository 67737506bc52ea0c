//! Member roster endpoints. Reading needs a session; changes need an admin.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::services::{MemberPatch, NewMember};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminSession, ApiJson, CurrentSession, OptionalJson};
use crate::routes::auth::{parse_path_id, AddressFields};

const NOT_FOUND: &str = "Member not found.";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Name must be at most 200 characters."))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 320, message = "Email must be at most 320 characters."))]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(flatten)]
    pub address: AddressFields,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Name must be at most 200 characters."))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 320, message = "Email must be at most 320 characters."))]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(flatten)]
    pub address: AddressFields,
}

/// Body of a destructive request. Older clients send `confirmation`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[serde(default, alias = "confirmation")]
    pub confirm_text: Option<String>,
}

/// GET /api/members
pub async fn list_members(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.members().list().await?))
}

/// POST /api/members
pub async fn create_member(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(request): ApiJson<CreateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let created = state
        .members()
        .create(NewMember {
            name: request.name,
            email: request.email,
            password: request.password,
            is_admin: request.is_admin,
            address: request.address.into_address(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/members/:id
pub async fn update_member(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    let id = parse_path_id(&id, NOT_FOUND)?;

    let address = request.address;
    let view = state
        .members()
        .update(
            id,
            MemberPatch {
                name: request.name,
                email: request.email,
                is_admin: request.is_admin,
                address_line1: address.address_line1,
                address_line2: address.address_line2,
                city: address.city,
                state: address.state,
                postal_code: address.postal_code,
            },
        )
        .await?;
    Ok(Json(view))
}

/// DELETE /api/members/:id
pub async fn delete_member(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    let member = state
        .members()
        .delete(admin.actor(), id, request.confirm_text.as_deref())
        .await?;
    Ok(Json(json!({ "message": "Member deleted.", "member": member })))
}
