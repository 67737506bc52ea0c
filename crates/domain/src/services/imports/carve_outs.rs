//! Carve-out grid: one row per club date, one column per member first name.

use std::collections::HashMap;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use super::csv::{cell, normalize_header, parse_csv};
use super::{members_by_first_name, sanitize_batch_id, ImportRequest, ImportService, ImportSummary};
use crate::error::DomainError;
use crate::models::{Actor, CarveOut, CarveOutType, ImportSource, ImportTag, Meeting};
use crate::services::dates::{day_key, parse_sheet_date};

const SOURCE: ImportSource = ImportSource::LegacyCarveOuts;
const MAX_TITLE_CHARS: usize = 200;

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(r#"(?i)https?://[^\s"<>]+"#).unwrap();
}

/// First `http(s)` URL in the text, minus trailing punctuation.
fn first_url(text: &str) -> Option<&str> {
    URL_PATTERN
        .find(text)
        .map(|m| m.as_str().trim_end_matches([')', ',', '.', ';']))
}

/// Splits a free-text cell into a title and an optional URL.
pub(crate) fn title_and_url(raw: &str) -> (String, String) {
    let text = raw.trim();
    let Some(url) = first_url(text) else {
        let title: String = text.chars().take(MAX_TITLE_CHARS).collect();
        let title = if title.is_empty() {
            "Imported carve out".to_string()
        } else {
            title
        };
        return (title, String::new());
    };

    let start = text.find(url).unwrap_or_default();
    let separators: &[char] = &[' ', '\t', '\n', ':', ';', ',', '-'];
    let before = text[..start].trim_end_matches(separators).trim();
    let after = text[start + url.len()..]
        .trim_start_matches(separators)
        .trim();

    let title: String = if before.is_empty() { after } else { before }
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    if title.is_empty() {
        (url.to_string(), url.to_string())
    } else {
        (title, url.to_string())
    }
}

const KEYWORDS: [(CarveOutType, &[&str]); 5] = [
    (
        CarveOutType::Podcast,
        &["podcast", "podcasts.apple.com", "spotify.com/show", "overcast.fm"],
    ),
    (
        CarveOutType::Book,
        &["goodreads.com", "book", "novel", "memoir", "biography"],
    ),
    (
        CarveOutType::Movie,
        &["movie", "film", "documentary", "imdb.com/title"],
    ),
    (
        CarveOutType::Video,
        &[
            "youtu.be",
            "youtube.com",
            "netflix",
            "primevideo.com",
            "vimeo.com",
            "video",
        ],
    ),
    (
        CarveOutType::Article,
        &["substack.com", "medium.com", "nytimes.com", "article", "essay", "blog"],
    ),
];

/// Guesses a type from keywords, checked in a fixed precedence order.
pub(crate) fn infer_type(title: &str, url: &str, notes: &str) -> CarveOutType {
    let text = format!("{title} {url} {notes}").to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(kind, _)| *kind)
        .unwrap_or(CarveOutType::Other)
}

impl ImportService {
    pub(super) async fn import_carve_outs(
        &self,
        actor: Actor,
        request: ImportRequest,
    ) -> Result<ImportSummary, DomainError> {
        let batch_id = sanitize_batch_id(request.batch_id.as_deref(), "legacy-carveouts");
        let rows = parse_csv(&request.csv);
        if rows.len() < 2 {
            return Err(DomainError::validation(
                "CSV must include at least a header and one data row.",
            ));
        }

        let headers: Vec<String> = rows[0].iter().map(|h| normalize_header(h)).collect();
        let date_index = request.mapping.column_index(&headers, "clubDate", 0);
        let contributors: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != date_index && !h.is_empty())
            .map(|(i, h)| (i, h.as_str()))
            .collect();
        if contributors.is_empty() {
            return Err(DomainError::validation(
                "No contributor columns found in CSV header.",
            ));
        }

        let admin = self
            .importing_admin(actor)
            .await?
            .ok_or_else(|| DomainError::validation("Admin member not found."))?;
        let members = self.store.list_members().await?;
        let by_first_name = members_by_first_name(&members);

        let meetings = self.store.list_meetings().await?;
        let mut by_day: HashMap<String, &Meeting> = HashMap::new();
        for meeting in &meetings {
            by_day.entry(day_key(meeting.date)).or_insert(meeting);
        }

        let tag = ImportTag::new(SOURCE, batch_id.clone());
        let mut warnings = Vec::new();
        let mut parsed_entries = 0;
        let mut imported = 0;

        for (i, row) in rows[1..].iter().enumerate() {
            let row_number = i + 2;
            let date_value = cell(row, date_index);

            let Some(date) = parse_sheet_date(date_value) else {
                if row.iter().any(|c| !c.trim().is_empty()) {
                    warnings.push(format!(
                        "Row {row_number}: could not parse Club Date; row skipped."
                    ));
                }
                continue;
            };

            let Some(meeting) = by_day.get(&day_key(date)) else {
                warnings.push(format!(
                    "Row {row_number}: no meeting found for {date_value}; carve outs skipped for this row."
                ));
                continue;
            };

            for &(column, header) in &contributors {
                let raw = cell(row, column);
                if raw.is_empty() {
                    continue;
                }
                parsed_entries += 1;

                let member = match by_first_name.get(header) {
                    Some(member) => *member,
                    None => {
                        warnings.push(format!(
                            "Row {row_number}, column {}: member '{header}' not found; assigned to admin.",
                            column + 1
                        ));
                        &admin
                    }
                };

                let (title, url) = title_and_url(raw);
                let carve_out_type = infer_type(&title, &url, raw);

                if !request.dry_run {
                    let now = Utc::now();
                    let carve_out = CarveOut {
                        id: Uuid::new_v4(),
                        title,
                        carve_out_type,
                        url,
                        notes: raw.to_string(),
                        member_id: member.id,
                        meeting_id: meeting.id,
                        import: Some(tag.clone()),
                        created_at: now,
                        updated_at: now,
                    };
                    self.store.insert_carve_out(&carve_out).await?;
                }
                imported += 1;
            }
        }

        Ok(ImportSummary {
            batch_id,
            dry_run: request.dry_run,
            parsed_entries: Some(parsed_entries),
            imported_carve_outs: Some(imported),
            warnings: Some(warnings),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{actor, meeting_fixture, seed_member, store};
    use crate::store::{CarveOutStore, MeetingStore};
    use chrono::TimeZone;

    #[test]
    fn test_title_and_url() {
        assert_eq!(
            title_and_url("Project Hail Mary - https://goodreads.com/book/1)."),
            (
                "Project Hail Mary".to_string(),
                "https://goodreads.com/book/1".to_string()
            )
        );
        assert_eq!(
            title_and_url("https://youtu.be/xyz - great talk"),
            ("great talk".to_string(), "https://youtu.be/xyz".to_string())
        );
        assert_eq!(
            title_and_url("https://example.com/a"),
            (
                "https://example.com/a".to_string(),
                "https://example.com/a".to_string()
            )
        );
        assert_eq!(
            title_and_url("Just a title"),
            ("Just a title".to_string(), String::new())
        );
        assert_eq!(title_and_url("   ").0, "Imported carve out");
        assert_eq!(title_and_url(&"a".repeat(300)).0.len(), 200);
    }

    #[test]
    fn test_infer_type_precedence() {
        assert_eq!(infer_type("A podcast about books", "", ""), CarveOutType::Podcast);
        assert_eq!(infer_type("Great novel", "", ""), CarveOutType::Book);
        assert_eq!(infer_type("x", "https://imdb.com/title/tt1", ""), CarveOutType::Movie);
        assert_eq!(infer_type("x", "https://vimeo.com/1", ""), CarveOutType::Video);
        assert_eq!(infer_type("A blog post", "", ""), CarveOutType::Article);
        assert_eq!(infer_type("Hiking boots", "", ""), CarveOutType::Other);
    }

    #[tokio::test]
    async fn test_import_matches_meetings_and_members() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        let jane = seed_member(&store, "Jane Doe", false).await;
        let meeting = meeting_fixture(
            &admin,
            Utc.with_ymd_and_hms(2024, 3, 5, 19, 0, 0).unwrap(),
        );
        store.insert_meeting(&meeting).await.unwrap();
        let service = ImportService::new(store.clone());

        let csv = "\
Club Date,Jane,Zed
3/5/2024,Dune https://goodreads.com/dune,Some movie
45356,,
not a date,x,
2024-04-01,Nothing,
";
        let request = ImportRequest {
            csv: csv.into(),
            batch_id: Some("grid".into()),
            ..Default::default()
        };

        let dry = service
            .import(
                actor(&admin),
                SOURCE,
                ImportRequest {
                    dry_run: true,
                    ..request.clone()
                },
            )
            .await
            .unwrap();
        assert_eq!(dry.imported_carve_outs, Some(2));
        assert!(store.list_carve_outs().await.unwrap().is_empty());

        let summary = service.import(actor(&admin), SOURCE, request).await.unwrap();
        assert_eq!(summary.parsed_entries, Some(2));
        assert_eq!(summary.imported_carve_outs, Some(2));
        let warnings = summary.warnings.unwrap();
        assert_eq!(warnings.len(), 3, "{warnings:?}");
        assert!(warnings[0].contains("member 'zed' not found"));
        assert!(warnings[1].starts_with("Row 4: could not parse"));
        assert!(warnings[2].starts_with("Row 5: no meeting found"));

        let carve_outs = store.list_carve_outs().await.unwrap();
        let dune = carve_outs.iter().find(|c| c.title == "Dune").unwrap();
        assert_eq!(dune.member_id, jane.id);
        assert_eq!(dune.meeting_id, meeting.id);
        assert_eq!(dune.carve_out_type, CarveOutType::Book);
        assert_eq!(dune.url, "https://goodreads.com/dune");
        let movie = carve_outs.iter().find(|c| c.title == "Some movie").unwrap();
        assert_eq!(movie.member_id, admin.id);
        assert_eq!(movie.carve_out_type, CarveOutType::Movie);

        let rolled_back = service
            .rollback(actor(&admin), SOURCE, "grid", Some("DELETE"))
            .await
            .unwrap();
        assert_eq!(rolled_back.deleted_carve_outs, Some(2));
        assert!(store.find_meeting(meeting.id).await.unwrap().is_some());
    }
}
