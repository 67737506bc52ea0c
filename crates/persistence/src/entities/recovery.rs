//! Emergency recovery use entity for database operations.

use chrono::{DateTime, Utc};
use domain::models::EmergencyRecoveryUse;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct EmergencyRecoveryUseEntity {
    pub id: Uuid,
    pub code_hash: String,
    pub used_at: DateTime<Utc>,
    pub used_by: Uuid,
}

impl From<EmergencyRecoveryUseEntity> for EmergencyRecoveryUse {
    fn from(entity: EmergencyRecoveryUseEntity) -> Self {
        EmergencyRecoveryUse {
            id: entity.id,
            code_hash: entity.code_hash,
            used_at: entity.used_at,
            used_by: entity.used_by,
        }
    }
}
