//! Meeting lifecycle: scheduling, editing, completion and deletion.
//!
//! At most one meeting occupies the upcoming slot. The check runs before
//! insert without a transaction, so two concurrent creations can both see a
//! free slot; that window is accepted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{
    Actor, Meeting, MeetingHost, MeetingPodcast, MeetingStatus, MeetingView, Member, Podcast,
};
use crate::services::dates::parse_date;
use crate::services::podcasts::CONFIRM_TEXT;
use crate::store::ClubStore;

#[derive(Debug, Clone, Default)]
pub struct NewMeeting {
    pub date: String,
    pub host: String,
    pub podcast: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. `podcast` is tri-state: `None` leaves it alone,
/// `Some(None)` or an empty id detaches, `Some(Some(id))` attaches.
#[derive(Debug, Clone, Default)]
pub struct MeetingPatch {
    pub date: Option<String>,
    pub host: Option<String>,
    pub podcast: Option<Option<String>>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(value: &str, not_found: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(value.trim()).map_err(|_| DomainError::not_found(not_found))
}

pub struct MeetingService {
    store: Arc<dyn ClubStore>,
}

impl MeetingService {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<MeetingView>, DomainError> {
        let meetings = self.store.list_meetings().await?;
        let members: HashMap<Uuid, Member> = self
            .store
            .list_members()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let podcasts: HashMap<Uuid, Podcast> = self
            .store
            .list_podcasts()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let now = Utc::now();
        Ok(meetings
            .iter()
            .map(|m| {
                let podcast = m.podcast_id.and_then(|id| podcasts.get(&id));
                format_meeting(m, members.get(&m.host_id), podcast, now)
            })
            .collect())
    }

    pub async fn create(&self, actor: Actor, input: NewMeeting) -> Result<MeetingView, DomainError> {
        require_admin(actor)?;

        let (Some(raw_date), Some(raw_host)) =
            (non_empty(Some(input.date.as_str())), non_empty(Some(input.host.as_str())))
        else {
            return Err(DomainError::validation("date and host are required."));
        };
        let date =
            parse_date(raw_date).ok_or_else(|| DomainError::validation("A valid date is required."))?;

        let host = self.load_host(raw_host).await?;
        let location = resolve_location(&host, input.location.as_deref())?;

        let podcast = match non_empty(input.podcast.as_deref()) {
            Some(id) => Some(self.load_selectable_podcast(id).await?),
            None => None,
        };

        let now = Utc::now();
        let slot_taken = self.upcoming_slot_taken(now, None).await?;

        let mut meeting = Meeting {
            id: Uuid::new_v4(),
            date,
            host_id: host.id,
            podcast_id: podcast.as_ref().map(|p| p.id),
            location,
            notes: input.notes.unwrap_or_default().trim().to_string(),
            status: Some(MeetingStatus::Scheduled),
            completed_at: None,
            import: None,
            created_at: now,
            updated_at: now,
        };
        if slot_taken {
            meeting.complete(now);
        }

        self.store.insert_meeting(&meeting).await?;

        if slot_taken {
            if let Some(podcast_id) = meeting.podcast_id {
                self.store
                    .mark_podcast_discussed(podcast_id, meeting.id)
                    .await?;
            }
        }

        tracing::info!(
            meeting_id = %meeting.id,
            status = %meeting.effective_status(now),
            "Meeting created"
        );
        self.view(&meeting).await
    }

    pub async fn edit(
        &self,
        actor: Actor,
        meeting_id: Uuid,
        patch: MeetingPatch,
    ) -> Result<MeetingView, DomainError> {
        let existing = self.load_meeting(meeting_id).await?;

        if !actor.is_admin_or(existing.host_id) {
            return Err(DomainError::forbidden(
                "Only admins or the meeting host can edit this meeting.",
            ));
        }

        let now = Utc::now();
        let mut meeting = existing.clone();
        // Pin legacy rows so a date change cannot move them into the upcoming slot.
        meeting.status = Some(existing.effective_status(now));
        let was_completed = meeting.status == Some(MeetingStatus::Completed);
        if existing.status.is_none()
            && !was_completed
            && self.upcoming_slot_taken(now, Some(existing.id)).await?
        {
            meeting.complete(now);
        }

        if let Some(raw_date) = non_empty(patch.date.as_deref()) {
            meeting.date = parse_date(raw_date)
                .ok_or_else(|| DomainError::validation("A valid date is required."))?;
        }

        // non-admin host changes are ignored
        let host = match non_empty(patch.host.as_deref()).filter(|_| actor.is_admin) {
            Some(raw_host) => self.load_host(raw_host).await?,
            None => self.load_host(&existing.host_id.to_string()).await?,
        };
        meeting.host_id = host.id;
        meeting.location = resolve_location(&host, patch.location.as_deref())?;

        if let Some(podcast) = &patch.podcast {
            meeting.podcast_id = match non_empty(podcast.as_deref()) {
                Some(id) => Some(parse_id(id, "Podcast not found.")?),
                None => None,
            };
        }

        if let Some(new_podcast) = meeting.podcast_id.filter(|id| Some(*id) != existing.podcast_id) {
            self.load_selectable_podcast(&new_podcast.to_string()).await?;
        }

        if let Some(notes) = patch.notes {
            meeting.notes = notes;
        }
        meeting.updated_at = now;

        if !self.store.update_meeting(&meeting).await? {
            return Err(DomainError::not_found("Meeting not found."));
        }

        if !was_completed && meeting.completed_at.is_some() {
            if let Some(podcast_id) = meeting.podcast_id {
                self.store
                    .mark_podcast_discussed(podcast_id, meeting.id)
                    .await?;
            }
        }
        if was_completed && meeting.podcast_id != existing.podcast_id {
            if let Some(old) = existing.podcast_id {
                self.store
                    .revert_podcast_if_discussed_at(old, meeting.id)
                    .await?;
            }
            if let Some(new) = meeting.podcast_id {
                self.store.mark_podcast_discussed(new, meeting.id).await?;
            }
        }

        tracing::info!(meeting_id = %meeting.id, member_id = %actor.id, "Meeting updated");
        self.view(&meeting).await
    }

    pub async fn complete(
        &self,
        actor: Actor,
        meeting_id: Uuid,
        notes: &str,
    ) -> Result<MeetingView, DomainError> {
        require_admin(actor)?;

        let notes = notes.trim();
        if notes.is_empty() {
            return Err(DomainError::validation("Completion notes are required."));
        }

        let meeting = self.load_meeting(meeting_id).await?;
        let now = Utc::now();
        if meeting.is_completed(now) {
            return Err(DomainError::invalid_state("Meeting is already completed."));
        }
        let Some(podcast_id) = meeting.podcast_id else {
            return Err(DomainError::invalid_state(
                "Select a podcast before completing this meeting.",
            ));
        };

        let completed = self
            .store
            .complete_meeting(meeting_id, notes, now)
            .await?
            .ok_or_else(|| DomainError::invalid_state("Meeting is already completed."))?;

        self.store
            .mark_podcast_discussed(podcast_id, completed.id)
            .await?;

        tracing::info!(meeting_id = %completed.id, podcast_id = %podcast_id, "Meeting completed");
        self.view(&completed).await
    }

    /// Deleting a completed meeting requires the typed confirmation and
    /// returns its podcast to the queue.
    pub async fn delete(
        &self,
        actor: Actor,
        meeting_id: Uuid,
        confirm_text: Option<&str>,
    ) -> Result<(), DomainError> {
        require_admin(actor)?;

        let meeting = self.load_meeting(meeting_id).await?;
        let completed = meeting.is_completed(Utc::now());

        if completed && confirm_text != Some(CONFIRM_TEXT) {
            return Err(DomainError::validation(
                "Past meeting deletion requires typing DELETE.",
            ));
        }

        self.store
            .delete_carve_outs_for_meetings(&[meeting.id])
            .await?;
        self.store.delete_meeting(meeting.id).await?;

        if completed {
            if let Some(podcast_id) = meeting.podcast_id {
                self.store
                    .revert_podcast_if_discussed_at(podcast_id, meeting.id)
                    .await?;
            }
        }

        tracing::info!(meeting_id = %meeting.id, completed, "Meeting deleted");
        Ok(())
    }

    /// Whether any meeting other than `except` holds the upcoming slot.
    pub async fn upcoming_slot_taken(
        &self,
        now: DateTime<Utc>,
        except: Option<Uuid>,
    ) -> Result<bool, DomainError> {
        match except {
            None => Ok(self
                .store
                .find_effective_scheduled_meeting(now)
                .await?
                .is_some()),
            Some(id) => Ok(self
                .store
                .list_meetings()
                .await?
                .iter()
                .any(|m| m.id != id && m.is_effectively_scheduled(now))),
        }
    }

    async fn load_meeting(&self, id: Uuid) -> Result<Meeting, DomainError> {
        self.store
            .find_meeting(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Meeting not found."))
    }

    async fn load_host(&self, raw_id: &str) -> Result<Member, DomainError> {
        let id = parse_id(raw_id, "Host not found.")?;
        self.store
            .find_member(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Host not found."))
    }

    async fn load_selectable_podcast(&self, raw_id: &str) -> Result<Podcast, DomainError> {
        let id = parse_id(raw_id, "Podcast not found.")?;
        let podcast = self
            .store
            .find_podcast(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Podcast not found."))?;
        if !podcast.is_pending() {
            return Err(DomainError::invalid_state(
                "Only Podcasts To Discuss can be selected for meetings.",
            ));
        }
        Ok(podcast)
    }

    async fn view(&self, meeting: &Meeting) -> Result<MeetingView, DomainError> {
        let host = self.store.find_member(meeting.host_id).await?;
        let podcast = match meeting.podcast_id {
            Some(id) => self.store.find_podcast(id).await?,
            None => None,
        };
        Ok(format_meeting(
            meeting,
            host.as_ref(),
            podcast.as_ref(),
            Utc::now(),
        ))
    }
}

fn require_admin(actor: Actor) -> Result<(), DomainError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(DomainError::forbidden("Admin access required."))
    }
}

/// Explicit location, else the host's formatted address.
fn resolve_location(host: &Member, explicit: Option<&str>) -> Result<String, DomainError> {
    if let Some(location) = non_empty(explicit) {
        return Ok(location.to_string());
    }
    let address = host.address.formatted();
    if address.is_empty() {
        return Err(DomainError::validation("location is required."));
    }
    Ok(address)
}

pub fn format_meeting(
    meeting: &Meeting,
    host: Option<&Member>,
    podcast: Option<&Podcast>,
    now: DateTime<Utc>,
) -> MeetingView {
    let host = match host {
        Some(member) => MeetingHost {
            id: member.id.to_string(),
            name: member.name.clone(),
            address: member.address.formatted(),
        },
        None => MeetingHost {
            id: meeting.host_id.to_string(),
            name: "Unknown".to_string(),
            address: String::new(),
        },
    };

    MeetingView {
        id: meeting.id,
        date: meeting.date,
        host,
        podcast: podcast.map(MeetingPodcast::from),
        location: meeting.location.clone(),
        notes: meeting.notes.clone(),
        status: meeting.effective_status(now),
        completed_at: meeting.completed_at,
        created_at: meeting.created_at,
    }
}
