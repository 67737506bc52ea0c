//! The "podcasts to discuss" sheet: an instruction row, a header row, a
//! placeholder row, then one podcast per row with a rating column per member.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use super::csv::{cell, normalize_header, parse_csv, parse_positive_int};
use super::{members_by_first_name, sanitize_batch_id, ImportRequest, ImportService, ImportSummary};
use crate::error::DomainError;
use crate::models::{ImportSource, ImportTag, Member, Podcast, PodcastStatus, Rating, RatingValue};

const SOURCE: ImportSource = ImportSource::LegacyPendingPodcasts;
const HEADER_ROW: usize = 1;
const FIRST_DATA_ROW: usize = 3;
const PLACEHOLDER_TITLE: &str = "enter podcast here";
const IGNORED_HEADERS: [&str; 2] = ["missing", "_sortkey"];

lazy_static! {
    static ref HOURS: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*h").unwrap();
    static ref MINUTES: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*m").unwrap();
}

/// Sheet rating text to a rating. Blank is no selection; unknown text is `None`.
pub(crate) fn normalize_rating(value: &str) -> Option<RatingValue> {
    match value.trim().to_lowercase().as_str() {
        "" | "no selection" | "no selection." => Some(RatingValue::NoSelection),
        "my podcast" => Some(RatingValue::MyPodcast),
        "meh" => Some(RatingValue::Meh),
        "i like it." => Some(RatingValue::Like),
        "i like it a lot." => Some(RatingValue::LikeALot),
        _ => None,
    }
}

/// Minutes from `95`, `1.5h`, `45m` or `1h 30m`; anything else is 1.
pub(crate) fn parse_duration_minutes(value: &str) -> i32 {
    let raw = value.trim().to_lowercase();
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() && n > 0.0 {
            return (n.round() as i32).max(1);
        }
    }

    let capture = |pattern: &Regex| {
        pattern
            .captures(&raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|n| n.is_finite() && *n > 0.0)
    };
    let hours = capture(&HOURS);
    // "1h 30m": only look for minutes after the hours part
    let minutes = match HOURS.find(&raw) {
        Some(h) => MINUTES
            .captures(&raw[h.end()..])
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        None => capture(&MINUTES),
    };

    let total = hours.unwrap_or(0.0) * 60.0 + minutes.unwrap_or(0.0);
    if total > 0.0 {
        (total.round() as i32).max(1)
    } else {
        1
    }
}

impl ImportService {
    pub(super) async fn import_pending_podcasts(
        &self,
        request: ImportRequest,
    ) -> Result<ImportSummary, DomainError> {
        let batch_id = sanitize_batch_id(request.batch_id.as_deref(), "legacy-pending");
        let rows = parse_csv(&request.csv);
        if rows.len() <= FIRST_DATA_ROW {
            return Err(DomainError::validation(
                "CSV must include instruction row, header row, placeholder row, and data rows.",
            ));
        }

        let headers: Vec<String> = rows[HEADER_ROW]
            .iter()
            .map(|h| normalize_header(h))
            .collect();
        let mapping = &request.mapping;
        let column = |key: &str, fallback: usize| mapping.column_index(&headers, key, fallback);
        let title_col = column("podcastTitle", 0);
        let host_col = column("podcastHost", 1);
        let count_col = column("podcastEpisodeCount", 2);
        let names_col = column("podcastEpisodeNames", 3);
        let time_col = column("podcastTotalTimeMinutes", 4);
        let link_col = column("podcastLink", 5);
        let notes_col = column("podcastNotes", 6);

        let members = self.store.list_members().await?;
        let by_first_name = members_by_first_name(&members);
        let rating_columns: Vec<(usize, &Member)> = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| *i > notes_col && !h.is_empty())
            .filter(|(_, h)| !IGNORED_HEADERS.contains(&h.as_str()))
            .filter_map(|(i, h)| by_first_name.get(h.as_str()).map(|m| (i, *m)))
            .collect();

        let tag = ImportTag::new(SOURCE, batch_id.clone());
        let mut warnings = Vec::new();
        let mut parsed_rows = 0;
        let mut imported = 0;

        for (i, row) in rows[FIRST_DATA_ROW..].iter().enumerate() {
            let row_number = i + FIRST_DATA_ROW + 1;
            let title = cell(row, title_col);
            if title.is_empty() || title.to_lowercase().starts_with(PLACEHOLDER_TITLE) {
                continue;
            }
            parsed_rows += 1;

            let mut ratings: Vec<Rating> = Vec::new();
            let mut owner: Option<&Member> = None;
            for &(col, member) in &rating_columns {
                let raw = cell(row, col);
                let value = match normalize_rating(raw) {
                    Some(RatingValue::NoSelection) => continue,
                    Some(value) => value,
                    None => {
                        warnings.push(format!(
                            "Row {row_number}, {}: unrecognized rating '{raw}', treated as No selection.",
                            member.name
                        ));
                        continue;
                    }
                };

                if value == RatingValue::MyPodcast {
                    if owner.is_some() {
                        warnings.push(format!(
                            "Row {row_number}: multiple 'My podcast' owners found; using first match."
                        ));
                        continue;
                    }
                    owner = Some(member);
                }
                ratings.push(Rating::new(member.id, value));
            }

            let Some(owner) = owner else {
                warnings.push(format!(
                    "Row {row_number}: no 'My podcast' owner found; row skipped."
                ));
                continue;
            };

            if !request.dry_run {
                let now = Utc::now();
                let or_default = |value: &str, fallback: &str| {
                    if value.is_empty() {
                        fallback.to_string()
                    } else {
                        value.to_string()
                    }
                };
                let podcast = Podcast {
                    id: Uuid::new_v4(),
                    title: title.to_string(),
                    host: or_default(cell(row, host_col), "Unknown"),
                    episode_count: parse_positive_int(cell(row, count_col), 1),
                    episode_names: or_default(cell(row, names_col), "Unknown"),
                    total_time_minutes: parse_duration_minutes(cell(row, time_col)),
                    link: or_default(cell(row, link_col), "#"),
                    notes: cell(row, notes_col).to_string(),
                    submitted_by: owner.id,
                    ratings,
                    status: PodcastStatus::Pending,
                    discussed_meeting_id: None,
                    import: Some(tag.clone()),
                    created_at: now,
                    updated_at: now,
                };
                self.store.insert_podcast(&podcast).await?;
            }
            imported += 1;
        }

        Ok(ImportSummary {
            batch_id,
            dry_run: request.dry_run,
            parsed_rows: Some(parsed_rows),
            imported_podcasts: Some(imported),
            rating_columns: Some(rating_columns.iter().map(|(_, m)| m.name.clone()).collect()),
            warnings: Some(warnings),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Actor;
    use crate::services::test_support::{actor, seed_member, store};
    use crate::store::PodcastStore;

    #[test]
    fn test_normalize_rating() {
        assert_eq!(normalize_rating(" My Podcast "), Some(RatingValue::MyPodcast));
        assert_eq!(normalize_rating("i like it a lot."), Some(RatingValue::LikeALot));
        assert_eq!(normalize_rating("No Selection."), Some(RatingValue::NoSelection));
        assert_eq!(normalize_rating(""), Some(RatingValue::NoSelection));
        assert_eq!(normalize_rating("love it"), None);
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration_minutes("95"), 95);
        assert_eq!(parse_duration_minutes("0.4"), 1);
        assert_eq!(parse_duration_minutes("1.5h"), 90);
        assert_eq!(parse_duration_minutes("45 min"), 45);
        assert_eq!(parse_duration_minutes("1h 30m"), 90);
        assert_eq!(parse_duration_minutes("2 hrs"), 120);
        assert_eq!(parse_duration_minutes("long"), 1);
        assert_eq!(parse_duration_minutes(""), 1);
    }

    const SHEET: &str = "\
Fill in the rows below,,,,,,,,,
Title,Host,Episodes,Episode Names,Time,Link,Notes,Alice,Bob,Missing
Enter podcast here,,,,,,,,,
Serial,Sarah,12,All,10h,https://serial.example,great,My podcast,I like it a lot.,
Orphan,Nobody,1,One,30,#,,Meh,,
Shared,Host,2,Two,1h 30m,https://shared.example,,My podcast,My podcast,
Typo,Host,1,One,20,#,,My podcast,love it,
enter podcast here too,,,,,,,,,
";

    async fn run(dry_run: bool) -> (std::sync::Arc<dyn crate::store::ClubStore>, Actor, ImportSummary) {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        seed_member(&store, "Alice Smith", false).await;
        seed_member(&store, "Bob", false).await;
        let service = ImportService::new(store.clone());
        let summary = service
            .import(
                actor(&admin),
                SOURCE,
                ImportRequest {
                    csv: SHEET.into(),
                    batch_id: Some("queue".into()),
                    dry_run,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (store, actor(&admin), summary)
    }

    #[tokio::test]
    async fn test_import_pending_queue() {
        let (store, _, summary) = run(false).await;
        assert_eq!(summary.parsed_rows, Some(4));
        assert_eq!(summary.imported_podcasts, Some(3));
        assert_eq!(
            summary.rating_columns,
            Some(vec!["Alice Smith".to_string(), "Bob".to_string()])
        );
        let warnings = summary.warnings.unwrap();
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].contains("no 'My podcast' owner"));
        assert!(warnings[1].contains("multiple 'My podcast' owners"));
        assert!(warnings[2].contains("unrecognized rating 'love it'"));

        let podcasts = store.list_podcasts().await.unwrap();
        assert_eq!(podcasts.len(), 3);
        let serial = podcasts.iter().find(|p| p.title == "Serial").unwrap();
        assert_eq!(serial.status, PodcastStatus::Pending);
        assert_eq!(serial.total_time_minutes, 600);
        assert_eq!(serial.ranking_score(), 2);
        assert_eq!(serial.ratings.len(), 2);

        let shared = podcasts.iter().find(|p| p.title == "Shared").unwrap();
        assert_eq!(shared.total_time_minutes, 90);
        let owners = shared
            .ratings
            .iter()
            .filter(|r| r.value == RatingValue::MyPodcast)
            .count();
        assert_eq!(owners, 1);
        assert_eq!(shared.owner_rating().map(|r| r.member_id), Some(shared.submitted_by));
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() {
        let (store, _, summary) = run(true).await;
        assert!(summary.dry_run);
        assert_eq!(summary.imported_podcasts, Some(3));
        assert!(store.list_podcasts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_keeps_discussed_podcasts() {
        let (store, admin, _) = run(false).await;
        let mut podcasts = store.list_podcasts().await.unwrap();
        let discussed = podcasts.iter_mut().find(|p| p.title == "Serial").unwrap();
        discussed.status = PodcastStatus::Discussed;
        store.update_podcast(discussed).await.unwrap();

        let service = ImportService::new(store.clone());
        assert_eq!(
            service.list_batches(admin, SOURCE).await.unwrap(),
            vec!["queue".to_string()]
        );
        let summary = service
            .rollback(admin, SOURCE, "queue", Some("DELETE"))
            .await
            .unwrap();
        assert_eq!(summary.deleted_podcasts, Some(2));
        assert_eq!(store.list_podcasts().await.unwrap().len(), 1);
    }
}
