//! Bulk import of the club's legacy spreadsheets.
//!
//! Every imported record is tagged with its [`ImportSource`] and a batch id so
//! a whole run can be listed and rolled back later.

mod carve_outs;
pub mod csv;
mod meetings;
mod pending_podcasts;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::error::DomainError;
use crate::models::{Actor, ImportSource, Member};
use crate::services::podcasts::confirmed;
use crate::store::{sorted_batches, ClubStore};

pub use csv::{ColumnRef, FieldMapping};

const MAX_BATCH_ID_LEN: usize = 80;

/// One import run as submitted by an admin.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub csv: String,
    pub mapping: FieldMapping,
    pub batch_id: Option<String>,
    pub dry_run: bool,
}

/// Counts and warnings from an import run. Fields an importer does not
/// produce are left out of the response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub batch_id: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_meetings: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_podcasts: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_carve_outs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackSummary {
    pub batch_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_meetings: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_podcasts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_carve_outs: Option<u64>,
}

/// Replaces anything outside `[A-Za-z0-9_-]` with `-` and caps the length.
/// Empty input gets `{default_prefix}-{unix millis}`.
pub fn sanitize_batch_id(value: Option<&str>, default_prefix: &str) -> String {
    let raw = value.unwrap_or_default().trim();
    if raw.is_empty() {
        return format!("{}-{}", default_prefix, Utc::now().timestamp_millis());
    }
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .take(MAX_BATCH_ID_LEN)
        .collect()
}

fn require_csv(request: &ImportRequest) -> Result<(), DomainError> {
    if request.csv.trim().is_empty() {
        return Err(DomainError::validation("csv is required."));
    }
    Ok(())
}

pub struct ImportService {
    store: Arc<dyn ClubStore>,
}

impl ImportService {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    pub async fn import(
        &self,
        actor: Actor,
        source: ImportSource,
        request: ImportRequest,
    ) -> Result<ImportSummary, DomainError> {
        require_admin(actor)?;
        require_csv(&request)?;

        let summary = match source {
            ImportSource::LegacyMeetings => self.import_meetings(actor, request).await?,
            ImportSource::LegacyCarveOuts => self.import_carve_outs(actor, request).await?,
            ImportSource::LegacyPendingPodcasts => {
                self.import_pending_podcasts(request).await?
            }
        };

        tracing::info!(
            source = %source,
            batch_id = %summary.batch_id,
            dry_run = summary.dry_run,
            warnings = summary.warnings.as_ref().map_or(0, Vec::len),
            "Legacy import finished"
        );
        Ok(summary)
    }

    /// Distinct batch ids for `source`, newest first.
    pub async fn list_batches(
        &self,
        actor: Actor,
        source: ImportSource,
    ) -> Result<Vec<String>, DomainError> {
        require_admin(actor)?;
        let batches = match source {
            ImportSource::LegacyMeetings => {
                let mut all = self.store.list_meeting_import_batches(source).await?;
                all.extend(self.store.list_podcast_import_batches(source).await?);
                sorted_batches(all)
            }
            ImportSource::LegacyCarveOuts => {
                self.store.list_carve_out_import_batches(source).await?
            }
            ImportSource::LegacyPendingPodcasts => {
                self.store.list_podcast_import_batches(source).await?
            }
        };
        Ok(batches)
    }

    /// Deletes everything one run created. Pending podcast rollbacks leave
    /// podcasts that have since been discussed.
    pub async fn rollback(
        &self,
        actor: Actor,
        source: ImportSource,
        batch_id: &str,
        confirm_text: Option<&str>,
    ) -> Result<RollbackSummary, DomainError> {
        require_admin(actor)?;
        let batch_id = batch_id.trim();
        if batch_id.is_empty() {
            return Err(DomainError::validation("batchId is required."));
        }
        if !confirmed(confirm_text) {
            return Err(DomainError::validation(
                "Type DELETE to confirm import rollback.",
            ));
        }

        let mut summary = RollbackSummary {
            batch_id: batch_id.to_string(),
            ..Default::default()
        };

        match source {
            ImportSource::LegacyMeetings => {
                let meeting_ids: Vec<_> = self
                    .store
                    .find_meetings_by_batch(source, batch_id)
                    .await?
                    .iter()
                    .map(|m| m.id)
                    .collect();
                if !meeting_ids.is_empty() {
                    self.store.delete_carve_outs_for_meetings(&meeting_ids).await?;
                }
                summary.deleted_meetings = Some(self.store.delete_meetings(&meeting_ids).await?);
                summary.deleted_podcasts = Some(
                    self.store
                        .delete_podcasts_by_batch(source, batch_id, false)
                        .await?,
                );
            }
            ImportSource::LegacyCarveOuts => {
                summary.deleted_carve_outs = Some(
                    self.store
                        .delete_carve_outs_by_batch(source, batch_id)
                        .await?,
                );
            }
            ImportSource::LegacyPendingPodcasts => {
                summary.deleted_podcasts = Some(
                    self.store
                        .delete_podcasts_by_batch(source, batch_id, true)
                        .await?,
                );
            }
        }

        tracing::warn!(source = %source, batch_id = %batch_id, "Import batch rolled back");
        Ok(summary)
    }

    async fn importing_admin(&self, actor: Actor) -> Result<Option<Member>, DomainError> {
        Ok(self.store.find_member(actor.id).await?)
    }
}

fn require_admin(actor: Actor) -> Result<(), DomainError> {
    if !actor.is_admin {
        return Err(DomainError::forbidden("Admin access required."));
    }
    Ok(())
}

/// First-name index over members; the first member with a given first name wins.
fn members_by_first_name(members: &[Member]) -> std::collections::HashMap<String, &Member> {
    let mut index = std::collections::HashMap::new();
    for member in members {
        let key = member.first_name_key();
        if !key.is_empty() {
            index.entry(key).or_insert(member);
        }
    }
    index
}
