//! Meeting repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::{ImportSource, Meeting, MeetingStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::MeetingEntity;
use crate::metrics::QueryTimer;

const MEETING_COLUMNS: &str = "id, date, host_id, podcast_id, location, notes, status, \
    completed_at, import_source, import_batch_id, created_at, updated_at";

/// Repository for meeting database operations.
#[derive(Clone)]
pub struct MeetingRepository {
    pool: PgPool,
}

impl MeetingRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Latest date first.
    pub async fn list(&self) -> Result<Vec<Meeting>, sqlx::Error> {
        let timer = QueryTimer::new("list_meetings");
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings ORDER BY date DESC, created_at DESC"
        );
        let result = sqlx::query_as::<_, MeetingEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Meeting>, sqlx::Error> {
        let timer = QueryTimer::new("find_meeting_by_id");
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1");
        let result = sqlx::query_as::<_, MeetingEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// A meeting flagged scheduled, or a legacy row with no completion
    /// signal and a date that has not passed.
    pub async fn find_effective_scheduled(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<Meeting>, sqlx::Error> {
        let timer = QueryTimer::new("find_effective_scheduled_meeting");
        let sql = format!(
            r#"
            SELECT {MEETING_COLUMNS}
            FROM meetings
            WHERE status = $1
               OR (status IS NULL AND completed_at IS NULL AND date >= $2)
            ORDER BY date
            LIMIT 1
            "#
        );
        let result = sqlx::query_as::<_, MeetingEntity>(&sql)
            .bind(MeetingStatus::Scheduled.as_str())
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    pub async fn insert(&self, meeting: &Meeting) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_meeting");
        let result = sqlx::query(
            r#"
            INSERT INTO meetings (
                id, date, host_id, podcast_id, location, notes, status, completed_at,
                import_source, import_batch_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(meeting.id)
        .bind(meeting.date)
        .bind(meeting.host_id)
        .bind(meeting.podcast_id)
        .bind(&meeting.location)
        .bind(&meeting.notes)
        .bind(meeting.status.map(|s| s.as_str()))
        .bind(meeting.completed_at)
        .bind(meeting.import.as_ref().map(|t| t.source.as_str()))
        .bind(meeting.import.as_ref().map(|t| t.batch_id.as_str()))
        .bind(meeting.created_at)
        .bind(meeting.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn update(&self, meeting: &Meeting) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_meeting");
        let result = sqlx::query(
            r#"
            UPDATE meetings
            SET date = $2,
                host_id = $3,
                podcast_id = $4,
                location = $5,
                notes = $6,
                status = $7,
                completed_at = $8,
                import_source = $9,
                import_batch_id = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(meeting.id)
        .bind(meeting.date)
        .bind(meeting.host_id)
        .bind(meeting.podcast_id)
        .bind(&meeting.location)
        .bind(&meeting.notes)
        .bind(meeting.status.map(|s| s.as_str()))
        .bind(meeting.completed_at)
        .bind(meeting.import.as_ref().map(|t| t.source.as_str()))
        .bind(meeting.import.as_ref().map(|t| t.batch_id.as_str()))
        .bind(meeting.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Completes the meeting only if nothing has completed it yet. `None`
    /// means the guard did not match.
    pub async fn complete(
        &self,
        id: Uuid,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Meeting>, sqlx::Error> {
        let timer = QueryTimer::new("complete_meeting");
        let sql = format!(
            r#"
            UPDATE meetings
            SET status = $4, completed_at = $3, notes = $2, updated_at = $3
            WHERE id = $1
              AND status IS DISTINCT FROM $4
              AND completed_at IS NULL
            RETURNING {MEETING_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, MeetingEntity>(&sql)
            .bind(id)
            .bind(notes)
            .bind(now)
            .bind(MeetingStatus::Completed.as_str())
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Podcasts discussed at the meeting are detached by the foreign key.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_meeting");
        let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn find_by_podcast(&self, podcast_id: Uuid) -> Result<Vec<Meeting>, sqlx::Error> {
        let timer = QueryTimer::new("find_meetings_by_podcast");
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE podcast_id = $1");
        let result = sqlx::query_as::<_, MeetingEntity>(&sql)
            .bind(podcast_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let timer = QueryTimer::new("delete_meetings");
        let result = sqlx::query("DELETE FROM meetings WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn reassign_hosts(&self, from: Uuid, to: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("reassign_meeting_hosts");
        let result = sqlx::query("UPDATE meetings SET host_id = $2 WHERE host_id = $1")
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Distinct batch ids for `source`, descending.
    pub async fn list_import_batches(
        &self,
        source: ImportSource,
    ) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("list_meeting_import_batches");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT import_batch_id COLLATE "C" AS batch_id
            FROM meetings
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

    pub async fn find_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> Result<Vec<Meeting>, sqlx::Error> {
        let timer = QueryTimer::new("find_meetings_by_batch");
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE import_source = $1 AND import_batch_id = $2"
        );
        let result = sqlx::query_as::<_, MeetingEntity>(&sql)
            .bind(source.as_str())
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}
