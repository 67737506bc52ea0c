//! Carve outs attached to meetings.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{
    Actor, CarveOut, CarveOutMeeting, CarveOutType, CarveOutView, Meeting, Member, MemberRef,
};
use crate::services::podcasts::confirmed;
use crate::store::ClubStore;

/// Body of a create or edit. `carve_out_type` is raw client input.
#[derive(Debug, Clone, Default)]
pub struct CarveOutInput {
    pub title: String,
    pub carve_out_type: Option<String>,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub meeting: String,
}

impl CarveOutInput {
    fn required(&self) -> Result<(&str, &str), DomainError> {
        let title = self.title.trim();
        let meeting = self.meeting.trim();
        if title.is_empty() || meeting.is_empty() {
            return Err(DomainError::validation("title and meeting are required."));
        }
        Ok((title, meeting))
    }

    fn parsed_type(&self) -> Result<Option<CarveOutType>, DomainError> {
        match self.carve_out_type.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => CarveOutType::parse(&raw.to_lowercase())
                .map(Some)
                .ok_or_else(|| DomainError::validation("Invalid carve out type.")),
        }
    }
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().unwrap_or_default().trim().to_string()
}

pub struct CarveOutService {
    store: Arc<dyn ClubStore>,
}

impl CarveOutService {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    /// Newest first. Entries whose member or meeting is gone are hidden.
    pub async fn list(&self) -> Result<Vec<CarveOutView>, DomainError> {
        let (carve_outs, members, meetings) = self.load_all().await?;
        Ok(carve_outs
            .iter()
            .filter_map(|c| {
                let member = members.get(&c.member_id)?;
                let meeting = meetings.get(&c.meeting_id)?;
                Some(format_carve_out(c, member.to_ref(), Some(meeting)))
            })
            .collect())
    }

    /// Anonymous listing: every carve out with a live meeting, member hidden.
    pub async fn list_public(&self) -> Result<Vec<CarveOutView>, DomainError> {
        let (carve_outs, _, meetings) = self.load_all().await?;
        Ok(carve_outs
            .iter()
            .filter_map(|c| {
                let meeting = meetings.get(&c.meeting_id)?;
                Some(format_carve_out(c, MemberRef::redacted(), Some(meeting)))
            })
            .collect())
    }

    async fn load_all(
        &self,
    ) -> Result<(Vec<CarveOut>, HashMap<Uuid, Member>, HashMap<Uuid, Meeting>), DomainError> {
        let carve_outs = self.store.list_carve_outs().await?;
        let members = self
            .store
            .list_members()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let meetings = self
            .store
            .list_meetings()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        Ok((carve_outs, members, meetings))
    }

    pub async fn create(
        &self,
        actor: Actor,
        input: CarveOutInput,
    ) -> Result<CarveOutView, DomainError> {
        let (title, meeting_id) = input.required()?;
        let carve_out_type = input.parsed_type()?.unwrap_or_default();
        let meeting = self.load_meeting(meeting_id).await?;

        let now = Utc::now();
        let carve_out = CarveOut {
            id: Uuid::new_v4(),
            title: title.to_string(),
            carve_out_type,
            url: trimmed(&input.url),
            notes: trimmed(&input.notes),
            member_id: actor.id,
            meeting_id: meeting.id,
            import: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_carve_out(&carve_out).await?;

        tracing::info!(carve_out_id = %carve_out.id, meeting_id = %meeting.id, "Carve out created");
        self.view(&carve_out, Some(&meeting)).await
    }

    pub async fn edit(
        &self,
        actor: Actor,
        id: Uuid,
        input: CarveOutInput,
    ) -> Result<CarveOutView, DomainError> {
        let mut carve_out = self.load_carve_out(id).await?;
        if !actor.is_admin_or(carve_out.member_id) {
            return Err(DomainError::forbidden(
                "Only admins or the member who submitted this carve out can edit it.",
            ));
        }

        let (title, meeting_id) = input.required()?;
        let carve_out_type = input.parsed_type()?;
        let meeting = self.load_meeting(meeting_id).await?;

        carve_out.title = title.to_string();
        if let Some(carve_out_type) = carve_out_type {
            carve_out.carve_out_type = carve_out_type;
        }
        carve_out.url = trimmed(&input.url);
        carve_out.notes = trimmed(&input.notes);
        carve_out.meeting_id = meeting.id;
        carve_out.updated_at = Utc::now();

        if !self.store.update_carve_out(&carve_out).await? {
            return Err(DomainError::not_found("Carve out not found."));
        }
        tracing::info!(carve_out_id = %carve_out.id, "Carve out updated");
        self.view(&carve_out, Some(&meeting)).await
    }

    /// Returns the deleted carve out's id and title.
    pub async fn delete(
        &self,
        actor: Actor,
        id: Uuid,
        confirm_text: Option<&str>,
    ) -> Result<(Uuid, String), DomainError> {
        if !confirmed(confirm_text) {
            return Err(DomainError::validation(
                "Type DELETE to confirm carve out deletion.",
            ));
        }
        let carve_out = self.load_carve_out(id).await?;
        if !actor.is_admin_or(carve_out.member_id) {
            return Err(DomainError::forbidden(
                "Only admins or the member who submitted this carve out can delete it.",
            ));
        }

        self.store.delete_carve_out(id).await?;
        tracing::info!(carve_out_id = %id, deleted_by = %actor.id, "Carve out deleted");
        Ok((carve_out.id, carve_out.title))
    }

    async fn load_carve_out(&self, id: Uuid) -> Result<CarveOut, DomainError> {
        self.store
            .find_carve_out(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Carve out not found."))
    }

    async fn load_meeting(&self, raw_id: &str) -> Result<Meeting, DomainError> {
        let not_found = || DomainError::not_found("Meeting not found.");
        let id = Uuid::parse_str(raw_id).map_err(|_| not_found())?;
        self.store.find_meeting(id).await?.ok_or_else(not_found)
    }

    async fn view(
        &self,
        carve_out: &CarveOut,
        meeting: Option<&Meeting>,
    ) -> Result<CarveOutView, DomainError> {
        let member = self
            .store
            .find_member(carve_out.member_id)
            .await?
            .map(|m| m.to_ref())
            .unwrap_or_else(|| MemberRef::unknown(carve_out.member_id));
        Ok(format_carve_out(carve_out, member, meeting))
    }
}

pub fn format_carve_out(
    carve_out: &CarveOut,
    member: MemberRef,
    meeting: Option<&Meeting>,
) -> CarveOutView {
    CarveOutView {
        id: carve_out.id,
        title: carve_out.title.clone(),
        carve_out_type: carve_out.carve_out_type,
        url: carve_out.url.clone(),
        notes: carve_out.notes.clone(),
        member,
        meeting: meeting.map(|m| CarveOutMeeting {
            id: m.id,
            date: m.date,
        }),
        created_at: carve_out.created_at,
    }
}
