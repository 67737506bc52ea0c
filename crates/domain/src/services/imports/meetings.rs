//! Discussed-podcast history: one completed meeting and one discussed podcast
//! per spreadsheet row.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use super::csv::{normalize_header, parse_csv, parse_positive_int};
use super::{sanitize_batch_id, ImportRequest, ImportService, ImportSummary};
use crate::error::DomainError;
use crate::models::{
    Actor, ImportSource, ImportTag, Meeting, MeetingStatus, Member, Podcast, PodcastStatus,
};
use crate::services::dates::parse_sheet_date;

const SOURCE: ImportSource = ImportSource::LegacyMeetings;

/// Rows without a usable date are spread one day apart from here.
fn fallback_date(row_index: usize) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    base + Duration::days(row_index as i64)
}

impl ImportService {
    pub(super) async fn import_meetings(
        &self,
        actor: Actor,
        request: ImportRequest,
    ) -> Result<ImportSummary, DomainError> {
        let batch_id = sanitize_batch_id(request.batch_id.as_deref(), "legacy");
        let rows = parse_csv(&request.csv);
        if rows.len() < 2 {
            return Err(DomainError::validation(
                "CSV must include a header row and at least one data row.",
            ));
        }
        let headers: Vec<String> = rows[0].iter().map(|h| normalize_header(h)).collect();
        let data_rows = &rows[1..];

        if request.dry_run {
            return Ok(ImportSummary {
                batch_id,
                dry_run: true,
                rows: Some(data_rows.len()),
                message: Some("Dry run complete. No records were written.".to_string()),
                ..Default::default()
            });
        }

        let members = self.store.list_members().await?;
        let by_email: HashMap<String, &Member> =
            members.iter().map(|m| (m.email.to_lowercase(), m)).collect();
        let by_name: HashMap<String, &Member> =
            members.iter().map(|m| (m.name.to_lowercase(), m)).collect();
        let admin = self.importing_admin(actor).await?;

        let lookup = |email: &str, name: &str| {
            by_email
                .get(email)
                .or_else(|| by_name.get(name))
                .copied()
        };

        let mapping = &request.mapping;
        let tag = ImportTag::new(SOURCE, batch_id.clone());
        let mut warnings = Vec::new();
        let mut imported = 0;

        for (i, row) in data_rows.iter().enumerate() {
            let row_number = i + 2;
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let field = |key: &str| mapping.cell(row, &headers, key);

            let host_email = field("meetingHostEmail").to_lowercase();
            let host_name = field("meetingHostName").to_lowercase();
            let host = match lookup(&host_email, &host_name) {
                Some(host) => host,
                None => {
                    let admin = admin.as_ref().ok_or_else(|| {
                        DomainError::validation("Importer could not resolve a fallback host member.")
                    })?;
                    if !host_email.is_empty() || !host_name.is_empty() {
                        warnings.push(format!(
                            "Row {row_number}: host not found in members; assigned to admin."
                        ));
                    }
                    admin
                }
            };

            let submitter_email = field("podcastSubmittedByEmail").to_lowercase();
            let submitter_name = field("podcastSubmittedByName").to_lowercase();
            let submitter = lookup(&submitter_email, &submitter_name).unwrap_or(host);

            let title = field("podcastTitle");
            if title.is_empty() {
                warnings.push(format!(
                    "Row {row_number}: podcast title missing, fallback title applied."
                ));
            }
            let date = match parse_sheet_date(field("meetingDate")) {
                Some(date) => date,
                None => {
                    warnings.push(format!(
                        "Row {row_number}: meeting date missing/invalid, fallback date applied."
                    ));
                    fallback_date(i)
                }
            };

            let location = match field("meetingLocation") {
                "" => {
                    let address = host.address.formatted();
                    if address.is_empty() {
                        "Unknown".to_string()
                    } else {
                        address
                    }
                }
                explicit => explicit.to_string(),
            };

            let now = Utc::now();
            let podcast = Podcast {
                id: Uuid::new_v4(),
                title: non_empty_or(title, &format!("Imported podcast {row_number}")),
                host: non_empty_or(field("podcastHost"), "Unknown"),
                episode_count: parse_positive_int(field("podcastEpisodeCount"), 1),
                episode_names: non_empty_or(field("podcastEpisodeNames"), "Unknown"),
                total_time_minutes: parse_positive_int(field("podcastTotalTimeMinutes"), 1),
                link: non_empty_or(field("podcastLink"), "#"),
                notes: field("podcastNotes").to_string(),
                submitted_by: submitter.id,
                ratings: Vec::new(),
                status: PodcastStatus::Discussed,
                discussed_meeting_id: None,
                import: Some(tag.clone()),
                created_at: now,
                updated_at: now,
            };
            self.store.insert_podcast(&podcast).await?;

            let meeting = Meeting {
                id: Uuid::new_v4(),
                date,
                host_id: host.id,
                podcast_id: Some(podcast.id),
                location,
                notes: field("meetingNotes").to_string(),
                status: Some(MeetingStatus::Completed),
                completed_at: Some(date),
                import: Some(tag.clone()),
                created_at: now,
                updated_at: now,
            };
            self.store.insert_meeting(&meeting).await?;
            self.store
                .mark_podcast_discussed(podcast.id, meeting.id)
                .await?;

            imported += 1;
        }

        Ok(ImportSummary {
            batch_id,
            dry_run: false,
            imported_meetings: Some(imported),
            imported_podcasts: Some(imported),
            warnings: Some(warnings),
            ..Default::default()
        })
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::imports::{ColumnRef, FieldMapping};
    use crate::services::test_support::{
        actor, carve_out_fixture, seed_member, store,
    };
    use crate::store::{CarveOutStore, MeetingStore, PodcastStore};

    const CSV: &str = "\
Date,Host Email,Title,Show Host,Episodes,Minutes,Link
2023-05-01,bob@example.com,Serial,Sarah,12,600,https://serial.example
,ghost@example.com,,,,,
";

    fn request(batch: &str) -> ImportRequest {
        ImportRequest {
            csv: CSV.to_string(),
            mapping: FieldMapping::default()
                .with("meetingDate", ColumnRef::Header("date".into()))
                .with("meetingHostEmail", ColumnRef::Header("Host Email".into()))
                .with("podcastTitle", ColumnRef::Index(2))
                .with("podcastHost", ColumnRef::Header("show host".into()))
                .with("podcastEpisodeCount", ColumnRef::Header("episodes".into()))
                .with("podcastTotalTimeMinutes", ColumnRef::Header("minutes".into()))
                .with("podcastLink", ColumnRef::Header("link".into())),
            batch_id: Some(batch.to_string()),
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        let service = ImportService::new(store.clone());

        let summary = service
            .import(
                actor(&admin),
                SOURCE,
                ImportRequest {
                    dry_run: true,
                    ..request("b1")
                },
            )
            .await
            .unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.rows, Some(2));
        assert!(store.list_podcasts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rows_become_completed_meetings_with_discussed_podcasts() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        let bob = seed_member(&store, "Bob", false).await;
        let service = ImportService::new(store.clone());

        let summary = service
            .import(actor(&admin), SOURCE, request("spring"))
            .await
            .unwrap();
        assert_eq!(summary.imported_meetings, Some(2));
        let warnings = summary.warnings.unwrap();
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].starts_with("Row 3: host not found"));

        let podcasts = store.list_podcasts().await.unwrap();
        let serial = podcasts.iter().find(|p| p.title == "Serial").unwrap();
        assert_eq!(serial.status, PodcastStatus::Discussed);
        assert_eq!(serial.episode_count, 12);
        assert_eq!(serial.submitted_by, bob.id);
        let fallback = podcasts.iter().find(|p| p.title == "Imported podcast 3").unwrap();
        assert_eq!(fallback.link, "#");
        assert_eq!(fallback.host, "Unknown");
        assert_eq!(fallback.submitted_by, admin.id);

        let meeting = store
            .find_meeting(serial.discussed_meeting_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(meeting.host_id, bob.id);
        assert_eq!(meeting.podcast_id, Some(serial.id));
        assert_eq!(meeting.completed_at, Some(meeting.date));
        assert_eq!(meeting.location, bob.address.formatted());

        let fallback_meeting = store
            .find_meeting(fallback.discussed_meeting_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fallback_meeting.date, fallback_date(1));

        assert_eq!(
            service.list_batches(actor(&admin), SOURCE).await.unwrap(),
            vec!["spring".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rollback_removes_batch_and_its_carve_outs() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        seed_member(&store, "Bob", false).await;
        let service = ImportService::new(store.clone());
        service
            .import(actor(&admin), SOURCE, request("keep"))
            .await
            .unwrap();
        service
            .import(actor(&admin), SOURCE, request("drop"))
            .await
            .unwrap();

        let doomed = store.find_meetings_by_batch(SOURCE, "drop").await.unwrap();
        let carve_out = carve_out_fixture("Side note", &admin, doomed[0].id);
        store.insert_carve_out(&carve_out).await.unwrap();

        let summary = service
            .rollback(actor(&admin), SOURCE, "drop", Some("DELETE"))
            .await
            .unwrap();
        assert_eq!(summary.deleted_meetings, Some(2));
        assert_eq!(summary.deleted_podcasts, Some(2));
        assert!(store.find_carve_out(carve_out.id).await.unwrap().is_none());
        assert_eq!(store.list_meetings().await.unwrap().len(), 2);
        assert_eq!(
            service.list_batches(actor(&admin), SOURCE).await.unwrap(),
            vec!["keep".to_string()]
        );
    }
}
