//! Carve out entity for database operations.

use chrono::{DateTime, Utc};
use domain::models::{CarveOut, CarveOutType};
use sqlx::FromRow;
use uuid::Uuid;

use super::import_tag;

/// Database entity for carve outs.
#[derive(Debug, Clone, FromRow)]
pub struct CarveOutEntity {
    pub id: Uuid,
    pub title: String,
    #[sqlx(rename = "type")]
    pub carve_out_type: String,
    pub url: String,
    pub notes: String,
    pub member_id: Uuid,
    pub meeting_id: Uuid,
    pub import_source: Option<String>,
    pub import_batch_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CarveOutEntity> for CarveOut {
    fn from(entity: CarveOutEntity) -> Self {
        CarveOut {
            id: entity.id,
            title: entity.title,
            carve_out_type: CarveOutType::parse(&entity.carve_out_type)
                .unwrap_or(CarveOutType::Other),
            url: entity.url,
            notes: entity.notes,
            member_id: entity.member_id,
            meeting_id: entity.meeting_id,
            import: import_tag(entity.import_source.as_deref(), entity.import_batch_id),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
