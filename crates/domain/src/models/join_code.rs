//! Single-use registration codes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct JoinCode {
    pub id: Uuid,
    pub code_hash: String,
    pub created_by: Uuid,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl JoinCode {
    pub fn new(code_hash: String, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code_hash,
            created_by,
            used_by: None,
            used_at: None,
            created_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.used_at.is_none()
    }
}
