//! Member entity for database operations.

use chrono::{DateTime, Utc};
use domain::models::{AccountStatus, Address, Member};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for members.
#[derive(Debug, Clone, FromRow)]
pub struct MemberEntity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub is_admin: bool,
    pub account_status: String,
    pub claim_code_hash: Option<String>,
    pub claim_code_expires_at: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MemberEntity> for Member {
    fn from(entity: MemberEntity) -> Self {
        Member {
            id: entity.id,
            name: entity.name,
            email: entity.email,
            password_hash: entity.password_hash,
            address: Address {
                address_line1: entity.address_line1,
                address_line2: entity.address_line2,
                city: entity.city,
                state: entity.state,
                postal_code: entity.postal_code,
            },
            is_admin: entity.is_admin,
            // Rows written before the status column existed are claimed accounts.
            account_status: AccountStatus::parse(&entity.account_status)
                .unwrap_or(AccountStatus::Claimed),
            claim_code_hash: entity.claim_code_hash,
            claim_code_expires_at: entity.claim_code_expires_at,
            password_changed_at: entity.password_changed_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
