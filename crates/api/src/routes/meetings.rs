//! Meeting schedule endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::services::{MeetingPatch, NewMeeting};
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminSession, ApiJson, CurrentSession, OptionalJson};
use crate::routes::auth::parse_path_id;
use crate::routes::members::ConfirmRequest;

const NOT_FOUND: &str = "Meeting not found.";

/// Distinguishes an absent field (`None`) from an explicit null (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub podcast: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeetingRequest {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub podcast: Option<Option<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteMeetingRequest {
    #[serde(default)]
    pub notes: String,
}

/// GET /api/meetings
pub async fn list_meetings(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.meetings().list().await?))
}

/// POST /api/meetings
pub async fn create_meeting(
    State(state): State<AppState>,
    admin: AdminSession,
    ApiJson(request): ApiJson<CreateMeetingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .meetings()
        .create(
            admin.actor(),
            NewMeeting {
                date: request.date,
                host: request.host,
                podcast: request.podcast,
                location: request.location,
                notes: request.notes,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PATCH /api/meetings/:id
///
/// Hosts may edit their own meetings; admins any.
pub async fn update_meeting(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateMeetingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    let view = state
        .meetings()
        .edit(
            session.actor(),
            id,
            MeetingPatch {
                date: request.date,
                host: request.host,
                podcast: request.podcast,
                location: request.location,
                notes: request.notes,
            },
        )
        .await?;
    Ok(Json(view))
}

/// POST /api/meetings/:id/complete
pub async fn complete_meeting(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CompleteMeetingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    let view = state
        .meetings()
        .complete(admin.actor(), id, &request.notes)
        .await?;
    Ok(Json(view))
}

/// DELETE /api/meetings/:id
pub async fn delete_meeting(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    state
        .meetings()
        .delete(admin.actor(), id, request.confirm_text.as_deref())
        .await?;
    Ok(Json(json!({ "message": "Meeting deleted." })))
}
