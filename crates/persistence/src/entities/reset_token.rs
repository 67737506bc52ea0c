//! Password reset token entity for database operations.

use chrono::{DateTime, Utc};
use domain::models::PasswordResetToken;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for password reset tokens.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetTokenEntity {
    pub id: Uuid,
    pub member_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub requested_ip_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PasswordResetTokenEntity> for PasswordResetToken {
    fn from(entity: PasswordResetTokenEntity) -> Self {
        PasswordResetToken {
            id: entity.id,
            member_id: entity.member_id,
            token_hash: entity.token_hash,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            requested_ip_hash: entity.requested_ip_hash,
            created_at: entity.created_at,
        }
    }
}
