//! Resolved request identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::member::{Member, MemberView};

/// Who is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.id == owner_id
    }

    pub fn is_admin_or(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.owns(owner_id)
    }
}

/// Member behind a verified session cookie, plus the admin previewing as them.
#[derive(Debug, Clone)]
pub struct Session {
    pub member: Member,
    pub impersonator: Option<Member>,
    /// Issued-at of the token, milliseconds since the epoch.
    pub issued_at_ms: i64,
}

impl Session {
    pub fn member_id(&self) -> Uuid {
        self.member.id
    }

    /// Authorization always uses the impersonated member's rights.
    pub fn is_admin(&self) -> bool {
        self.member.is_admin
    }

    pub fn actor(&self) -> Actor {
        Actor {
            id: self.member.id,
            is_admin: self.member.is_admin,
        }
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonator.is_some()
    }

    pub fn view(&self) -> SessionMemberView {
        SessionMemberView {
            member: MemberView::from(&self.member),
            is_impersonating: self.is_impersonating(),
            impersonator_id: self.impersonator.as_ref().map(|m| m.id),
            impersonator_name: self.impersonator.as_ref().map(|m| m.name.clone()),
        }
    }
}

/// `GET /auth/me` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMemberView {
    #[serde(flatten)]
    pub member: MemberView,
    pub is_impersonating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator_name: Option<String>,
}
