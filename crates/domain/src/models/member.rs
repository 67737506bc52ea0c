//! Member domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::validation;

/// Name shown in place of a member on public (signed-out) views.
pub const REDACTED_MEMBER_NAME: &str = "Club Member";

/// Credential state of a member account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Created by an admin without a password; must claim before logging in.
    Pending,
    #[default]
    Claimed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Claimed => "claimed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AccountStatus::Pending),
            "claimed" => Some(AccountStatus::Claimed),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured US postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl Address {
    /// Trims every field and uppercases the state.
    pub fn normalized(&self) -> Self {
        Self {
            address_line1: self.address_line1.trim().to_string(),
            address_line2: self.address_line2.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_uppercase(),
            postal_code: self.postal_code.trim().to_string(),
        }
    }

    /// Checks the fields in order and returns the first failure message.
    /// Expects a normalized address.
    pub fn validate(&self) -> Result<(), String> {
        validation::validate_address_line1(&self.address_line1)
            .and_then(|_| validation::validate_city(&self.city))
            .and_then(|_| validation::validate_state_code(&self.state))
            .and_then(|_| validation::validate_postal_code(&self.postal_code))
            .map_err(|e| validation::error_message(&e))
    }

    /// `line1[, line2], City, ST 12345`, or empty when incomplete.
    pub fn formatted(&self) -> String {
        if self.address_line1.is_empty()
            || self.city.is_empty()
            || self.state.is_empty()
            || self.postal_code.is_empty()
        {
            return String::new();
        }

        let mut line1 = self.address_line1.clone();
        if !self.address_line2.is_empty() {
            line1.push_str(", ");
            line1.push_str(&self.address_line2);
        }
        format!(
            "{}, {}, {} {}",
            line1, self.city, self.state, self.postal_code
        )
    }
}

/// Club member as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    /// Always stored lowercased.
    pub email: String,
    pub password_hash: Option<String>,
    pub address: Address,
    pub is_admin: bool,
    pub account_status: AccountStatus,
    pub claim_code_hash: Option<String>,
    pub claim_code_expires_at: Option<DateTime<Utc>>,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// A new claimed member with no password; callers fill in the rest.
    pub fn new(name: &str, email: &str, address: Address, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash: None,
            address,
            is_admin: false,
            account_status: AccountStatus::Claimed,
            claim_code_hash: None,
            claim_code_expires_at: None,
            password_changed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.account_status == AccountStatus::Pending
    }

    /// Whether a password login is possible at all.
    pub fn can_log_in(&self) -> bool {
        !self.is_pending() && self.password_hash.is_some()
    }

    /// A session issued at `issued_at_ms` is stale if the password changed after it.
    pub fn password_changed_after(&self, issued_at_ms: i64) -> bool {
        self.password_changed_at
            .is_some_and(|changed| changed.timestamp_millis() > issued_at_ms)
    }

    /// Lowercased first word of the name, used by the importers.
    pub fn first_name_key(&self) -> String {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }

    pub fn to_ref(&self) -> MemberRef {
        MemberRef {
            id: self.id.to_string(),
            name: self.name.clone(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Member as returned to clients. Never carries credential hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub address: String,
    pub is_admin: bool,
    pub account_status: AccountStatus,
}

impl From<&Member> for MemberView {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
            address_line1: member.address.address_line1.clone(),
            address_line2: member.address.address_line2.clone(),
            city: member.address.city.clone(),
            state: member.address.state.clone(),
            postal_code: member.address.postal_code.clone(),
            address: member.address.formatted(),
            is_admin: member.is_admin,
            account_status: member.account_status,
        }
    }
}

/// `{id, name}` reference embedded in other views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: String,
    pub name: String,
}

impl MemberRef {
    /// Placeholder for members that no longer exist.
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id: id.to_string(),
            name: "Unknown".to_string(),
        }
    }

    pub fn redacted() -> Self {
        Self {
            id: String::new(),
            name: REDACTED_MEMBER_NAME.to_string(),
        }
    }
}
