//! In-memory store used by tests and local development.
//!
//! Every trait method takes the single lock for its whole duration, which
//! gives each call the same per-record atomicity the database provides.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    sorted_batches, CarveOutStore, JoinCodeStore, MeetingStore, MemberStore, PodcastStore,
    RecoveryStore, ResetTokenStore, StoreError, StoreResult,
};
use crate::models::{
    CarveOut, EmergencyRecoveryUse, ImportSource, JoinCode, Meeting, MeetingStatus, Member,
    PasswordResetToken, Podcast, PodcastStatus, Rating,
};

#[derive(Debug, Default)]
struct Tables {
    members: HashMap<Uuid, Member>,
    join_codes: HashMap<Uuid, JoinCode>,
    reset_tokens: HashMap<Uuid, PasswordResetToken>,
    recovery_uses: Vec<EmergencyRecoveryUse>,
    podcasts: HashMap<Uuid, Podcast>,
    meetings: HashMap<Uuid, Meeting>,
    carve_outs: HashMap<Uuid, CarveOut>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken() -> StoreError {
    StoreError::Duplicate("A member with that email already exists.".to_string())
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn count_members(&self) -> StoreResult<i64> {
        Ok(self.tables.read().await.members.len() as i64)
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        let tables = self.tables.read().await;
        let mut members: Vec<Member> = tables.members.values().cloned().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(members)
    }

    async fn find_member(&self, id: Uuid) -> StoreResult<Option<Member>> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn find_member_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        let tables = self.tables.read().await;
        Ok(tables.members.values().find(|m| m.email == email).cloned())
    }

    async fn insert_member(&self, member: &Member) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.members.values().any(|m| m.email == member.email) {
            return Err(email_taken());
        }
        tables.members.insert(member.id, member.clone());
        Ok(())
    }

    async fn update_member(&self, member: &Member) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables
            .members
            .values()
            .any(|m| m.email == member.email && m.id != member.id)
        {
            return Err(email_taken());
        }
        match tables.members.get_mut(&member.id) {
            Some(existing) => {
                *existing = member.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_member(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.members.remove(&id).is_some())
    }
}

#[async_trait]
impl JoinCodeStore for MemoryStore {
    async fn insert_join_code(&self, code: &JoinCode) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .join_codes
            .values()
            .any(|c| c.code_hash == code.code_hash)
        {
            return Err(StoreError::Duplicate("join code collision".to_string()));
        }
        tables.join_codes.insert(code.id, code.clone());
        Ok(())
    }

    async fn consume_join_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<JoinCode>> {
        let mut tables = self.tables.write().await;
        let code = tables
            .join_codes
            .values_mut()
            .find(|c| c.code_hash == code_hash && c.used_at.is_none());
        Ok(code.map(|c| {
            c.used_at = Some(now);
            c.clone()
        }))
    }

    async fn set_join_code_used_by(&self, id: Uuid, member_id: Uuid) -> StoreResult<()> {
        if let Some(code) = self.tables.write().await.join_codes.get_mut(&id) {
            code.used_by = Some(member_id);
        }
        Ok(())
    }

    async fn release_join_code(&self, id: Uuid) -> StoreResult<()> {
        if let Some(code) = self.tables.write().await.join_codes.get_mut(&id) {
            code.used_at = None;
            code.used_by = None;
        }
        Ok(())
    }

    async fn count_active_join_codes(&self) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.join_codes.values().filter(|c| c.is_active()).count() as i64)
    }

    async fn reassign_join_codes(&self, from: Uuid, to: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        for code in tables.join_codes.values_mut() {
            if code.created_by == from {
                code.created_by = to;
            }
            if code.used_by == Some(from) {
                code.used_by = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResetTokenStore for MemoryStore {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .reset_tokens
            .values()
            .any(|t| t.token_hash == token.token_hash)
        {
            return Err(StoreError::Duplicate("reset token collision".to_string()));
        }
        tables.reset_tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn count_reset_requests_by_ip(
        &self,
        ip_hash: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .values()
            .filter(|t| t.requested_ip_hash.as_deref() == Some(ip_hash) && t.created_at >= since)
            .count() as i64)
    }

    async fn count_reset_requests_for_member(
        &self,
        member_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .values()
            .filter(|t| t.member_id == member_id && t.created_at >= since)
            .count() as i64)
    }

    async fn invalidate_reset_tokens(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
        unexpired_only: bool,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for token in tables.reset_tokens.values_mut() {
            if token.member_id != member_id || token.used_at.is_some() {
                continue;
            }
            if unexpired_only && token.expires_at <= now {
                continue;
            }
            token.used_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn find_active_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasswordResetToken>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reset_tokens
            .values()
            .find(|t| t.token_hash == token_hash && t.is_active(now))
            .cloned())
    }

    async fn delete_reset_tokens_for_member(&self, member_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.reset_tokens.len();
        tables.reset_tokens.retain(|_, t| t.member_id != member_id);
        Ok((before - tables.reset_tokens.len()) as u64)
    }
}

#[async_trait]
impl RecoveryStore for MemoryStore {
    async fn find_recovery_use(
        &self,
        code_hash: &str,
    ) -> StoreResult<Option<EmergencyRecoveryUse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recovery_uses
            .iter()
            .find(|r| r.code_hash == code_hash)
            .cloned())
    }

    async fn insert_recovery_use(&self, record: &EmergencyRecoveryUse) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .recovery_uses
            .iter()
            .any(|r| r.code_hash == record.code_hash)
        {
            return Err(StoreError::Duplicate(
                "Recovery code has already been used.".to_string(),
            ));
        }
        tables.recovery_uses.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl PodcastStore for MemoryStore {
    async fn list_podcasts(&self) -> StoreResult<Vec<Podcast>> {
        let tables = self.tables.read().await;
        let mut podcasts: Vec<Podcast> = tables.podcasts.values().cloned().collect();
        podcasts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(podcasts)
    }

    async fn find_podcast(&self, id: Uuid) -> StoreResult<Option<Podcast>> {
        Ok(self.tables.read().await.podcasts.get(&id).cloned())
    }

    async fn insert_podcast(&self, podcast: &Podcast) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .podcasts
            .insert(podcast.id, podcast.clone());
        Ok(())
    }

    async fn update_podcast(&self, podcast: &Podcast) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.podcasts.get_mut(&podcast.id) {
            Some(existing) => {
                *existing = podcast.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_podcast_rating(&self, podcast_id: Uuid, rating: &Rating) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.podcasts.get_mut(&podcast_id) {
            Some(podcast) => {
                podcast.upsert_rating(rating.member_id, rating.value);
                podcast.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_podcast(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.podcasts.remove(&id).is_some();
        if removed {
            for meeting in tables.meetings.values_mut() {
                if meeting.podcast_id == Some(id) {
                    meeting.podcast_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn mark_podcast_discussed(
        &self,
        podcast_id: Uuid,
        meeting_id: Uuid,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.podcasts.get_mut(&podcast_id) {
            Some(podcast) => {
                podcast.mark_discussed(meeting_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revert_podcast_if_discussed_at(
        &self,
        podcast_id: Uuid,
        meeting_id: Uuid,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.podcasts.get_mut(&podcast_id) {
            Some(podcast) if podcast.discussed_meeting_id == Some(meeting_id) => {
                podcast.revert_to_pending();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reassign_podcasts(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for podcast in tables.podcasts.values_mut() {
            if podcast.submitted_by == from {
                podcast.submitted_by = to;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn remove_member_ratings(&self, member_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut removed = 0;
        for podcast in tables.podcasts.values_mut() {
            let before = podcast.ratings.len();
            podcast.ratings.retain(|r| r.member_id != member_id);
            removed += (before - podcast.ratings.len()) as u64;
        }
        Ok(removed)
    }

    async fn list_podcast_import_batches(&self, source: ImportSource) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(sorted_batches(
            tables
                .podcasts
                .values()
                .filter_map(|p| p.import.as_ref())
                .filter(|tag| tag.source == source)
                .map(|tag| tag.batch_id.clone())
                .collect(),
        ))
    }

    async fn delete_podcasts_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
        pending_only: bool,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<Uuid> = tables
            .podcasts
            .values()
            .filter(|p| p.import.as_ref().is_some_and(|t| t.matches(source, batch_id)))
            .filter(|p| !pending_only || p.status == PodcastStatus::Pending)
            .map(|p| p.id)
            .collect();
        for id in &doomed {
            tables.podcasts.remove(id);
        }
        for meeting in tables.meetings.values_mut() {
            if meeting.podcast_id.is_some_and(|id| doomed.contains(&id)) {
                meeting.podcast_id = None;
            }
        }
        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn list_meetings(&self) -> StoreResult<Vec<Meeting>> {
        let tables = self.tables.read().await;
        let mut meetings: Vec<Meeting> = tables.meetings.values().cloned().collect();
        meetings.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(meetings)
    }

    async fn find_meeting(&self, id: Uuid) -> StoreResult<Option<Meeting>> {
        Ok(self.tables.read().await.meetings.get(&id).cloned())
    }

    async fn find_effective_scheduled_meeting(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Meeting>> {
        let tables = self.tables.read().await;
        Ok(tables
            .meetings
            .values()
            .find(|m| m.is_effectively_scheduled(now))
            .cloned())
    }

    async fn insert_meeting(&self, meeting: &Meeting) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .meetings
            .insert(meeting.id, meeting.clone());
        Ok(())
    }

    async fn update_meeting(&self, meeting: &Meeting) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.meetings.get_mut(&meeting.id) {
            Some(existing) => {
                *existing = meeting.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_meeting(
        &self,
        id: Uuid,
        notes: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Meeting>> {
        let mut tables = self.tables.write().await;
        match tables.meetings.get_mut(&id) {
            Some(meeting)
                if meeting.status != Some(MeetingStatus::Completed)
                    && meeting.completed_at.is_none() =>
            {
                meeting.complete(now);
                meeting.notes = notes.to_string();
                meeting.updated_at = now;
                Ok(Some(meeting.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_meeting(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.meetings.remove(&id).is_some();
        if removed {
            for podcast in tables.podcasts.values_mut() {
                if podcast.discussed_meeting_id == Some(id) {
                    podcast.discussed_meeting_id = None;
                }
            }
        }
        Ok(removed)
    }

    async fn find_meetings_by_podcast(&self, podcast_id: Uuid) -> StoreResult<Vec<Meeting>> {
        let tables = self.tables.read().await;
        Ok(tables
            .meetings
            .values()
            .filter(|m| m.podcast_id == Some(podcast_id))
            .cloned()
            .collect())
    }

    async fn delete_meetings(&self, ids: &[Uuid]) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut removed = 0;
        for id in ids {
            if tables.meetings.remove(id).is_some() {
                removed += 1;
            }
        }
        for podcast in tables.podcasts.values_mut() {
            if podcast.discussed_meeting_id.is_some_and(|id| ids.contains(&id)) {
                podcast.discussed_meeting_id = None;
            }
        }
        Ok(removed)
    }

    async fn reassign_meeting_hosts(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for meeting in tables.meetings.values_mut() {
            if meeting.host_id == from {
                meeting.host_id = to;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn list_meeting_import_batches(&self, source: ImportSource) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(sorted_batches(
            tables
                .meetings
                .values()
                .filter_map(|m| m.import.as_ref())
                .filter(|tag| tag.source == source)
                .map(|tag| tag.batch_id.clone())
                .collect(),
        ))
    }

    async fn find_meetings_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> StoreResult<Vec<Meeting>> {
        let tables = self.tables.read().await;
        Ok(tables
            .meetings
            .values()
            .filter(|m| m.import.as_ref().is_some_and(|t| t.matches(source, batch_id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CarveOutStore for MemoryStore {
    async fn list_carve_outs(&self) -> StoreResult<Vec<CarveOut>> {
        let tables = self.tables.read().await;
        let mut carve_outs: Vec<CarveOut> = tables.carve_outs.values().cloned().collect();
        carve_outs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(carve_outs)
    }

    async fn find_carve_out(&self, id: Uuid) -> StoreResult<Option<CarveOut>> {
        Ok(self.tables.read().await.carve_outs.get(&id).cloned())
    }

    async fn insert_carve_out(&self, carve_out: &CarveOut) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .carve_outs
            .insert(carve_out.id, carve_out.clone());
        Ok(())
    }

    async fn update_carve_out(&self, carve_out: &CarveOut) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.carve_outs.get_mut(&carve_out.id) {
            Some(existing) => {
                *existing = carve_out.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_carve_out(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.carve_outs.remove(&id).is_some())
    }

    async fn delete_carve_outs_for_meetings(&self, meeting_ids: &[Uuid]) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.carve_outs.len();
        tables
            .carve_outs
            .retain(|_, c| !meeting_ids.contains(&c.meeting_id));
        Ok((before - tables.carve_outs.len()) as u64)
    }

    async fn delete_carve_outs_for_member(&self, member_id: Uuid) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.carve_outs.len();
        tables.carve_outs.retain(|_, c| c.member_id != member_id);
        Ok((before - tables.carve_outs.len()) as u64)
    }

    async fn list_carve_out_import_batches(
        &self,
        source: ImportSource,
    ) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(sorted_batches(
            tables
                .carve_outs
                .values()
                .filter_map(|c| c.import.as_ref())
                .filter(|tag| tag.source == source)
                .map(|tag| tag.batch_id.clone())
                .collect(),
        ))
    }

    async fn delete_carve_outs_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.carve_outs.len();
        tables
            .carve_outs
            .retain(|_, c| !c.import.as_ref().is_some_and(|t| t.matches(source, batch_id)));
        Ok((before - tables.carve_outs.len()) as u64)
    }
}
