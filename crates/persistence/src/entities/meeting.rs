//! Meeting entity for database operations.

use chrono::{DateTime, Utc};
use domain::models::{Meeting, MeetingStatus};
use sqlx::FromRow;
use uuid::Uuid;

use super::import_tag;

/// Database entity for meetings. `status` is nullable for rows that predate
/// the explicit lifecycle flag.
#[derive(Debug, Clone, FromRow)]
pub struct MeetingEntity {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub host_id: Uuid,
    pub podcast_id: Option<Uuid>,
    pub location: String,
    pub notes: String,
    pub status: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub import_source: Option<String>,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MeetingEntity> for Meeting {
    fn from(entity: MeetingEntity) -> Self {
        Meeting {
            id: entity.id,
            date: entity.date,
            host_id: entity.host_id,
            podcast_id: entity.podcast_id,
            location: entity.location,
            notes: entity.notes,
            status: entity.status.as_deref().and_then(MeetingStatus::parse),
            completed_at: entity.completed_at,
            import: import_tag(entity.import_source.as_deref(), entity.import_batch_id),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
