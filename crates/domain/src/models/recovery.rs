//! Consumption records for the operator-configured recovery code.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyRecoveryUse {
    pub id: Uuid,
    /// Hash of the configured code; unique, so each configured value works once.
    pub code_hash: String,
    pub used_at: DateTime<Utc>,
    pub used_by: Uuid,
}
