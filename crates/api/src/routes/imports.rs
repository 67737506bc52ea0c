//! Legacy spreadsheet import endpoints. All require an admin.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use domain::models::ImportSource;
use domain::services::imports::{FieldMapping, ImportRequest};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminSession, ApiJson, OptionalJson};

/// Maps the URL segment to its import source.
fn source_from_path(segment: &str) -> Result<ImportSource, ApiError> {
    match segment {
        "legacy-meetings" => Ok(ImportSource::LegacyMeetings),
        "legacy-carveouts" => Ok(ImportSource::LegacyCarveOuts),
        "legacy-pending-podcasts" => Ok(ImportSource::LegacyPendingPodcasts),
        _ => Err(ApiError::NotFound("Unknown import source.".to_string())),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Deserialize)]
pub struct RunImportRequest {
    #[serde(default)]
    pub csv: String,
    #[serde(default)]
    pub mapping: Option<FieldMapping>,
    #[serde(default)]
    pub options: Option<ImportOptions>,
}

impl From<RunImportRequest> for ImportRequest {
    fn from(request: RunImportRequest) -> Self {
        let options = request.options.unwrap_or_default();
        ImportRequest {
            csv: request.csv,
            mapping: request.mapping.unwrap_or_default(),
            batch_id: options.batch_id,
            dry_run: options.dry_run,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    #[serde(default)]
    pub batch_id: String,
    #[serde(default)]
    pub confirm_text: Option<String>,
}

/// GET /api/imports/:source
pub async fn list_batches(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(source): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let source = source_from_path(&source)?;
    let batches = state.imports().list_batches(admin.actor(), source).await?;
    Ok(Json(json!({ "batches": batches })))
}

/// POST /api/imports/:source
pub async fn run_import(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(source): Path<String>,
    ApiJson(request): ApiJson<RunImportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source = source_from_path(&source)?;
    let summary = state
        .imports()
        .import(admin.actor(), source, request.into())
        .await?;
    Ok(Json(summary))
}

/// DELETE /api/imports/:source
pub async fn rollback_batch(
    State(state): State<AppState>,
    admin: AdminSession,
    Path(source): Path<String>,
    OptionalJson(request): OptionalJson<RollbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let source = source_from_path(&source)?;
    let summary = state
        .imports()
        .rollback(
            admin.actor(),
            source,
            &request.batch_id,
            request.confirm_text.as_deref(),
        )
        .await?;
    Ok(Json(summary))
}
