//! Join code entity for database operations.

use chrono::{DateTime, Utc};
use domain::models::JoinCode;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for registration join codes.
#[derive(Debug, Clone, FromRow)]
pub struct JoinCodeEntity {
    pub id: Uuid,
    pub code_hash: String,
    pub created_by: Uuid,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<JoinCodeEntity> for JoinCode {
    fn from(entity: JoinCodeEntity) -> Self {
        JoinCode {
            id: entity.id,
            code_hash: entity.code_hash,
            created_by: entity.created_by,
            used_by: entity.used_by,
            used_at: entity.used_at,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_code_entity_to_domain() {
        let now = Utc::now();
        let entity = JoinCodeEntity {
            id: Uuid::new_v4(),
            code_hash: "abc".to_string(),
            created_by: Uuid::new_v4(),
            used_by: None,
            used_at: None,
            created_at: now,
        };

        let code: JoinCode = entity.into();
        assert_eq!(code.code_hash, "abc");
        assert!(code.is_active());
    }
}
