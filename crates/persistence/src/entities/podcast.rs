//! Podcast and rating entities for database operations.

use chrono::{DateTime, Utc};
use domain::models::{Podcast, PodcastStatus, Rating, RatingValue};
use sqlx::FromRow;
use uuid::Uuid;

use super::import_tag;

/// Database entity for podcasts. Ratings live in `podcast_ratings`.
#[derive(Debug, Clone, FromRow)]
pub struct PodcastEntity {
    pub id: Uuid,
    pub title: String,
    pub host: String,
    pub episode_count: i32,
    pub episode_names: String,
    pub total_time_minutes: i32,
    pub link: String,
    pub notes: String,
    pub submitted_by: Uuid,
    pub status: String,
    pub discussed_meeting_id: Option<Uuid>,
    pub import_source: Option<String>,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database entity for one member's rating of a podcast.
#[derive(Debug, Clone, FromRow)]
pub struct PodcastRatingEntity {
    pub podcast_id: Uuid,
    pub member_id: Uuid,
    pub value: String,
    pub points: i32,
}

impl PodcastRatingEntity {
    /// Unreadable values are dropped. Points are derived from the value.
    pub fn into_rating(self) -> Option<Rating> {
        RatingValue::from_stored(&self.value).map(|value| Rating::new(self.member_id, value))
    }
}

impl PodcastEntity {
    /// Assembles the domain podcast from its row and the ratings that belong to it.
    pub fn into_podcast(self, ratings: Vec<PodcastRatingEntity>) -> Podcast {
        let id = self.id;
        Podcast {
            id,
            title: self.title,
            host: self.host,
            episode_count: self.episode_count,
            episode_names: self.episode_names,
            total_time_minutes: self.total_time_minutes,
            link: self.link,
            notes: self.notes,
            submitted_by: self.submitted_by,
            ratings: ratings
                .into_iter()
                .filter(|r| r.podcast_id == id)
                .filter_map(PodcastRatingEntity::into_rating)
                .collect(),
            status: PodcastStatus::parse(&self.status).unwrap_or(PodcastStatus::Pending),
            discussed_meeting_id: self.discussed_meeting_id,
            import: import_tag(self.import_source.as_deref(), self.import_batch_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ImportSource;

    fn entity() -> PodcastEntity {
        let now = Utc::now();
        PodcastEntity {
            id: Uuid::new_v4(),
            title: "Hardcore History".to_string(),
            host: "Dan Carlin".to_string(),
            episode_count: 6,
            episode_names: "Blueprint for Armageddon".to_string(),
            total_time_minutes: 1200,
            link: "https://example.com/hh".to_string(),
            notes: String::new(),
            submitted_by: Uuid::new_v4(),
            status: "discussed".to_string(),
            discussed_meeting_id: Some(Uuid::new_v4()),
            import_source: Some("legacy-pending-podcasts-csv".to_string()),
            import_batch_id: Some("batch-1".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    fn rating(podcast_id: Uuid, value: &str, points: i32) -> PodcastRatingEntity {
        PodcastRatingEntity {
            podcast_id,
            member_id: Uuid::new_v4(),
            value: value.to_string(),
            points,
        }
    }

    #[test]
    fn test_podcast_entity_to_domain() {
        let entity = entity();
        let id = entity.id;
        let ratings = vec![
            rating(id, "I like it a lot.", 2),
            rating(id, "No Selection", 0),
            rating(Uuid::new_v4(), "Meh", 0),
        ];

        let podcast = entity.into_podcast(ratings);
        assert_eq!(podcast.status, PodcastStatus::Discussed);
        assert_eq!(podcast.ratings.len(), 2);
        assert_eq!(podcast.ratings[1].value, RatingValue::NoSelection);
        assert_eq!(podcast.ranking_score(), 2);
        let tag = podcast.import.unwrap();
        assert_eq!(tag.source, ImportSource::LegacyPendingPodcasts);
        assert_eq!(tag.batch_id, "batch-1");
    }

    #[test]
    fn test_unreadable_rating_dropped() {
        let entity = entity();
        let id = entity.id;
        let podcast = entity.into_podcast(vec![rating(id, "Loved it", 5)]);
        assert!(podcast.ratings.is_empty());
    }

    #[test]
    fn test_points_follow_value() {
        let r = rating(Uuid::new_v4(), "I like it.", 7).into_rating().unwrap();
        assert_eq!(r.points, 1);
    }
}
