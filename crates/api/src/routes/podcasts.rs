//! Podcast nomination, voting and queue endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::services::{ranking, NewPodcast};
use domain::store::MemberStore;
use domain::DomainError;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ApiJson, CurrentSession, OptionalJson, OptionalSession};
use crate::routes::auth::parse_path_id;
use crate::routes::members::ConfirmRequest;

const NOT_FOUND: &str = "Podcast not found.";

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPodcastRequest {
    #[serde(default)]
    #[validate(length(max = 300, message = "Title must be at most 300 characters."))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 300, message = "Host must be at most 300 characters."))]
    pub host: String,
    /// Number or numeric string.
    #[serde(default)]
    pub episode_count: Value,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Episode names must be at most 5000 characters."))]
    pub episode_names: String,
    #[serde(default)]
    pub total_time_minutes: Value,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Link must be at most 2000 characters."))]
    pub link: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters."))]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub rating: String,
}

/// Reads a JSON number or a numeric string. Anything else is absent.
fn number_field(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// GET /api/podcasts
pub async fn list_podcasts(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Result<impl IntoResponse, ApiError> {
    let podcasts = match session {
        Some(_) => state.podcasts().list().await?,
        None => state.podcasts().list_public().await?,
    };
    Ok(Json(podcasts))
}

/// POST /api/podcasts
pub async fn submit_podcast(
    State(state): State<AppState>,
    session: CurrentSession,
    ApiJson(request): ApiJson<SubmitPodcastRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let podcast = state
        .podcasts()
        .submit(
            session.actor(),
            NewPodcast {
                episode_count: number_field(&request.episode_count),
                total_time_minutes: number_field(&request.total_time_minutes),
                title: request.title,
                host: request.host,
                episode_names: request.episode_names,
                link: request.link,
                notes: request.notes,
            },
        )
        .await?;

    let members = state
        .store
        .list_members()
        .await
        .map_err(DomainError::from)?;
    Ok((
        StatusCode::CREATED,
        Json(ranking::format_podcast(&podcast, &members, None)),
    ))
}

/// GET /api/podcasts/discuss-queue
pub async fn discuss_queue(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.podcasts().discuss_queue().await?))
}

/// POST /api/podcasts/:id/vote
pub async fn vote(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    let view = state
        .podcasts()
        .vote(session.actor(), id, &request.rating)
        .await?;
    Ok(Json(view))
}

/// DELETE /api/podcasts/:id
pub async fn delete_podcast(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
    OptionalJson(request): OptionalJson<ConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_path_id(&id, NOT_FOUND)?;
    let deleted = state
        .podcasts()
        .delete(session.actor(), id, request.confirm_text.as_deref())
        .await?;

    if deleted.deleted_meetings > 0 {
        tracing::info!(
            podcast_id = %deleted.id,
            meetings = deleted.deleted_meetings,
            "Podcast deleted with attached meetings"
        );
    }
    Ok(Json(json!({
        "message": "Podcast deleted.",
        "podcast": { "id": deleted.id, "title": deleted.title }
    })))
}
