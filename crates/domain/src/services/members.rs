//! Admin member management.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared::password::{check_password_length, hash_password};

use crate::error::DomainError;
use crate::models::member::normalize_email;
use crate::models::{AccountStatus, Actor, Address, Member, MemberView, Rating, RatingValue};
use crate::services::accounts::{new_claim_code, MemberSummary};
use crate::store::ClubStore;

#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    /// Absent or empty creates a pending account with a claim code.
    pub password: Option<String>,
    pub is_admin: bool,
    pub address: Address,
}

/// Partial update. Address fields merge with the stored address.
#[derive(Debug, Clone, Default)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
    pub address_line1: Option<String>,
    /// `Some("")` clears line 2.
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
}

impl MemberPatch {
    fn has_address_fields(&self) -> bool {
        [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state,
            &self.postal_code,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.is_empty()))
    }

    fn merge_address(&self, current: &Address) -> Address {
        let pick = |value: &Option<String>, current: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(current)
                .to_string()
        };

        Address {
            address_line1: pick(&self.address_line1, &current.address_line1),
            address_line2: match &self.address_line2 {
                Some(line2) => line2.trim().to_string(),
                None => current.address_line2.clone(),
            },
            city: pick(&self.city, &current.city),
            state: pick(&self.state, &current.state).to_uppercase(),
            postal_code: pick(&self.postal_code, &current.postal_code),
        }
    }
}

/// A created member, plus the claim code when no password was set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMember {
    #[serde(flatten)]
    pub member: MemberView,
    pub claim_code: Option<String>,
    pub claim_code_expires_at: Option<DateTime<Utc>>,
}

pub struct MemberService {
    store: Arc<dyn ClubStore>,
}

impl MemberService {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<MemberView>, DomainError> {
        let members = self.store.list_members().await?;
        Ok(members.iter().map(MemberView::from).collect())
    }

    pub async fn create(&self, input: NewMember) -> Result<CreatedMember, DomainError> {
        let name = input.name.trim();
        let email = normalize_email(&input.email);
        let address = input.address.normalized();

        if name.is_empty() || email.is_empty() {
            return Err(DomainError::validation(
                "Name, email, and full address are required.",
            ));
        }
        address.validate().map_err(DomainError::Validation)?;

        if self.store.find_member_by_email(&email).await?.is_some() {
            return Err(DomainError::conflict(
                "A member with this email already exists.",
            ));
        }

        let password = input.password.unwrap_or_default();
        let now = Utc::now();
        let mut member = Member::new(name, &email, address, now);
        member.is_admin = input.is_admin;

        let claim = if password.is_empty() {
            member.account_status = AccountStatus::Pending;
            Some(new_claim_code(&mut member, now))
        } else {
            check_password_length(&password)?;
            member.password_hash = Some(hash_password(&password)?);
            None
        };

        self.store.insert_member(&member).await?;
        tracing::info!(
            member_id = %member.id,
            pending = member.is_pending(),
            "Member created by admin"
        );

        let (claim_code, claim_code_expires_at) = match claim {
            Some((code, expires_at)) => (Some(code), Some(expires_at)),
            None => (None, None),
        };
        Ok(CreatedMember {
            member: MemberView::from(&member),
            claim_code,
            claim_code_expires_at,
        })
    }

    pub async fn update(&self, id: Uuid, patch: MemberPatch) -> Result<MemberView, DomainError> {
        let mut member = self
            .store
            .find_member(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Member not found."))?;

        let email = patch
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty());
        if let Some(email) = &email {
            let taken = self
                .store
                .find_member_by_email(email)
                .await?
                .is_some_and(|other| other.id != id);
            if taken {
                return Err(DomainError::conflict(
                    "A member with this email already exists.",
                ));
            }
        }

        if patch.has_address_fields() {
            let merged = patch.merge_address(&member.address);
            merged.validate().map_err(DomainError::Validation)?;
            member.address = merged;
        }
        if let Some(name) = patch.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            member.name = name.to_string();
        }
        if let Some(email) = email {
            member.email = email;
        }
        if let Some(is_admin) = patch.is_admin {
            member.is_admin = is_admin;
        }
        member.updated_at = Utc::now();

        if !self.store.update_member(&member).await? {
            return Err(DomainError::not_found("Member not found."));
        }
        tracing::info!(member_id = %member.id, "Member updated");
        Ok(MemberView::from(&member))
    }

    /// Deletes a member. Hosted meetings, submitted podcasts and created join
    /// codes move to the deleting admin, who then holds `My podcast` on every
    /// inherited podcast; ratings, carve-outs and reset tokens go.
    pub async fn delete(
        &self,
        actor: Actor,
        id: Uuid,
        confirmation: Option<&str>,
    ) -> Result<MemberSummary, DomainError> {
        if !crate::services::podcasts::confirmed(confirmation) {
            return Err(DomainError::validation(
                "Type DELETE to confirm member deletion.",
            ));
        }
        if actor.owns(id) {
            return Err(DomainError::validation("You cannot delete your own account."));
        }

        let member = self
            .store
            .find_member(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Member not found."))?;

        let inherited: Vec<Uuid> = self
            .store
            .list_podcasts()
            .await?
            .iter()
            .filter(|p| p.submitted_by == id)
            .map(|p| p.id)
            .collect();

        let meetings = self.store.reassign_meeting_hosts(id, actor.id).await?;
        let podcasts = self.store.reassign_podcasts(id, actor.id).await?;
        self.store.remove_member_ratings(id).await?;
        let ownership = Rating::new(actor.id, RatingValue::MyPodcast);
        for podcast_id in &inherited {
            self.store.upsert_podcast_rating(*podcast_id, &ownership).await?;
        }
        let carve_outs = self.store.delete_carve_outs_for_member(id).await?;
        self.store.reassign_join_codes(id, actor.id).await?;
        self.store.delete_reset_tokens_for_member(id).await?;
        self.store.delete_member(id).await?;

        tracing::info!(
            member_id = %id,
            deleted_by = %actor.id,
            meetings,
            podcasts,
            carve_outs,
            "Member deleted"
        );
        Ok(MemberSummary::from(&member))
    }
}
