//! Podcast repository for database operations.
//!
//! A podcast row and its `podcast_ratings` rows are always written together
//! inside one transaction.

use std::collections::HashMap;

use domain::models::{ImportSource, Podcast, PodcastStatus, Rating};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::{PodcastEntity, PodcastRatingEntity};
use crate::metrics::QueryTimer;

const PODCAST_COLUMNS: &str = "id, title, host, episode_count, episode_names, \
    total_time_minutes, link, notes, submitted_by, status, discussed_meeting_id, \
    import_source, import_batch_id, created_at, updated_at";

/// Repository for podcast database operations.
#[derive(Clone)]
pub struct PodcastRepository {
    pool: PgPool,
}

impl PodcastRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest first, each with its ratings in the order they were first cast.
    pub async fn list(&self) -> Result<Vec<Podcast>, sqlx::Error> {
        let timer = QueryTimer::new("list_podcasts");
        let sql = format!("SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY created_at DESC");
        let entities = sqlx::query_as::<_, PodcastEntity>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let ratings = sqlx::query_as::<_, PodcastRatingEntity>(
            "SELECT podcast_id, member_id, value, points FROM podcast_ratings ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let mut by_podcast: HashMap<Uuid, Vec<PodcastRatingEntity>> = HashMap::new();
        for rating in ratings {
            by_podcast.entry(rating.podcast_id).or_default().push(rating);
        }

        Ok(entities
            .into_iter()
            .map(|entity| {
                let ratings = by_podcast.remove(&entity.id).unwrap_or_default();
                entity.into_podcast(ratings)
            })
            .collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Podcast>, sqlx::Error> {
        let timer = QueryTimer::new("find_podcast_by_id");
        let sql = format!("SELECT {PODCAST_COLUMNS} FROM podcasts WHERE id = $1");
        let entity = sqlx::query_as::<_, PodcastEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(entity) = entity else {
            timer.record();
            return Ok(None);
        };

        let ratings = sqlx::query_as::<_, PodcastRatingEntity>(
            r#"
            SELECT podcast_id, member_id, value, points
            FROM podcast_ratings
            WHERE podcast_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        Ok(Some(entity.into_podcast(ratings)))
    }

    pub async fn insert(&self, podcast: &Podcast) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_podcast");
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO podcasts (
                id, title, host, episode_count, episode_names, total_time_minutes, link, notes,
                submitted_by, status, discussed_meeting_id, import_source, import_batch_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(podcast.id)
        .bind(&podcast.title)
        .bind(&podcast.host)
        .bind(podcast.episode_count)
        .bind(&podcast.episode_names)
        .bind(podcast.total_time_minutes)
        .bind(&podcast.link)
        .bind(&podcast.notes)
        .bind(podcast.submitted_by)
        .bind(podcast.status.as_str())
        .bind(podcast.discussed_meeting_id)
        .bind(podcast.import.as_ref().map(|t| t.source.as_str()))
        .bind(podcast.import.as_ref().map(|t| t.batch_id.as_str()))
        .bind(podcast.created_at)
        .bind(podcast.updated_at)
        .execute(&mut *tx)
        .await?;

        for rating in &podcast.ratings {
            upsert_rating(&mut tx, podcast.id, rating).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(())
    }

    /// Overwrites the row and replaces its rating set. Ratings that survive
    /// keep their original position.
    pub async fn update(&self, podcast: &Podcast) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_podcast");
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE podcasts
            SET title = $2,
                host = $3,
                episode_count = $4,
                episode_names = $5,
                total_time_minutes = $6,
                link = $7,
                notes = $8,
                submitted_by = $9,
                status = $10,
                discussed_meeting_id = $11,
                import_source = $12,
                import_batch_id = $13,
                updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(podcast.id)
        .bind(&podcast.title)
        .bind(&podcast.host)
        .bind(podcast.episode_count)
        .bind(&podcast.episode_names)
        .bind(podcast.total_time_minutes)
        .bind(&podcast.link)
        .bind(&podcast.notes)
        .bind(podcast.submitted_by)
        .bind(podcast.status.as_str())
        .bind(podcast.discussed_meeting_id)
        .bind(podcast.import.as_ref().map(|t| t.source.as_str()))
        .bind(podcast.import.as_ref().map(|t| t.batch_id.as_str()))
        .bind(podcast.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            timer.record();
            return Ok(false);
        }

        let kept: Vec<Uuid> = podcast.ratings.iter().map(|r| r.member_id).collect();
        sqlx::query("DELETE FROM podcast_ratings WHERE podcast_id = $1 AND NOT (member_id = ANY($2))")
            .bind(podcast.id)
            .bind(kept.as_slice())
            .execute(&mut *tx)
            .await?;

        for rating in &podcast.ratings {
            upsert_rating(&mut tx, podcast.id, rating).await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(true)
    }

    /// Writes one member's rating and bumps the podcast's `updated_at`.
    pub async fn upsert_rating(&self, podcast_id: Uuid, rating: &Rating) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("upsert_podcast_rating");
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE podcasts SET updated_at = NOW() WHERE id = $1")
            .bind(podcast_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if touched == 0 {
            tx.rollback().await?;
            timer.record();
            return Ok(false);
        }

        upsert_rating(&mut tx, podcast_id, rating).await?;
        tx.commit().await?;
        timer.record();
        Ok(true)
    }

    /// Meetings pointing at the podcast are detached by the foreign key.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_podcast");
        let result = sqlx::query("DELETE FROM podcasts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn mark_discussed(&self, podcast_id: Uuid, meeting_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("mark_podcast_discussed");
        let result = sqlx::query(
            r#"
            UPDATE podcasts
            SET status = $3, discussed_meeting_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(podcast_id)
        .bind(meeting_id)
        .bind(PodcastStatus::Discussed.as_str())
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Conditional revert: only while the podcast still points at `meeting_id`.
    pub async fn revert_if_discussed_at(
        &self,
        podcast_id: Uuid,
        meeting_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("revert_podcast_if_discussed_at");
        let result = sqlx::query(
            r#"
            UPDATE podcasts
            SET status = $3, discussed_meeting_id = NULL, updated_at = NOW()
            WHERE id = $1 AND discussed_meeting_id = $2
            "#,
        )
        .bind(podcast_id)
        .bind(meeting_id)
        .bind(PodcastStatus::Pending.as_str())
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn reassign(&self, from: Uuid, to: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("reassign_podcasts");
        let result = sqlx::query("UPDATE podcasts SET submitted_by = $2 WHERE submitted_by = $1")
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn remove_member_ratings(&self, member_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("remove_member_ratings");
        let result = sqlx::query("DELETE FROM podcast_ratings WHERE member_id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Distinct batch ids for `source`, descending.
    pub async fn list_import_batches(&self, source: ImportSource) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("list_podcast_import_batches");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT import_batch_id COLLATE "C" AS batch_id
            FROM podcasts
            WHERE import_source = $1 AND import_batch_id IS NOT NULL
            ORDER BY batch_id DESC
            "#,
        )
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
        pending_only: bool,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_podcasts_by_batch");
        let result = sqlx::query(
            r#"
            DELETE FROM podcasts
            WHERE import_source = $1
              AND import_batch_id = $2
              AND (NOT $3 OR status = $4)
            "#,
        )
        .bind(source.as_str())
        .bind(batch_id)
        .bind(pending_only)
        .bind(PodcastStatus::Pending.as_str())
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}

async fn upsert_rating(
    tx: &mut Transaction<'_, Postgres>,
    podcast_id: Uuid,
    rating: &Rating,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO podcast_ratings (podcast_id, member_id, value, points)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (podcast_id, member_id)
        DO UPDATE SET value = EXCLUDED.value, points = EXCLUDED.points
        "#,
    )
    .bind(podcast_id)
    .bind(rating.member_id)
    .bind(rating.value.as_str())
    .bind(rating.points)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
