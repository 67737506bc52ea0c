//! Password reset tokens (emailed links and admin-issued codes share a table).

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Lifetime of both reset links and admin reset codes.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub member_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub requested_ip_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn new(
        member_id: Uuid,
        token_hash: String,
        requested_ip_hash: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            token_hash,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
            used_at: None,
            requested_ip_hash,
            created_at: now,
        }
    }

    /// Unused and not yet expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}
