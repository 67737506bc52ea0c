//! Carve out endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::services::CarveOutInput;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, CurrentSession, OptionalJson, OptionalSession};
use crate::routes::auth::parse_path_id;
use crate::routes::members::ConfirmRequest;

const NOT_FOUND: &str = "Carve out not found.";

#[derive(Debug, Deserialize, Validate)]
pub struct CarveOutRequest {
    #[serde(default)]
    #[validate(length(max = 300, message = "Title must be at most 300 characters."))]
    pub title: String,
    #[serde(default, rename = "type")]
    pub carve_out_type: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000, message = "URL must be at most 2000 characters."))]
    pub url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters."))]
    pub notes: Option<String>,
    #[serde(default)]
    pub meeting: String,
}

impl From<CarveOutRequest> for CarveOutInput {
    fn from(request: CarveOutRequest) -> Self {
        CarveOutInput {
            title: request.title,
            carve_out_type: request.carve_out_type,
            url: request.url,
            notes: request.notes,
            meeting: request.meeting,
        }
    }
}

/// GET /api/carveouts
pub async fn list_carve_outs(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<impl IntoResponse, ApiError> {
    let carve_outs = match session {
        Some(_) => state.carve_outs().list().await?,
        None => state.carve_outs().list_public().await?,
    };
    Ok(Json(carve_outs))
}

/// POST /api/carveouts
pub async fn create_carve_out(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(request): ApiJson<CarveOutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    let view = state
        .carve_outs()
        .create(session.actor(), request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// PATCH /api/carveouts/:id
pub async fn update_carve_out(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CarveOutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    let id = parse_path_id(&id, NOT_FOUND)?;
    let view = state
        .carve_outs()
        .edit(session.actor(), id, request.into())
        .await?;
    Ok(Json(view))
}

/// DELETE /api/carveouts/:id
pub async fn delete_carve_out(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    let (id, title) = state
        .carve_outs()
        .delete(session.actor(), id, request.confirm_text.as_deref())
        .await?;
    Ok(Json(json!({
        "message": "Carve out deleted.",
        "carveOut": { "id": id, "title": title }
    })))
}
