//! PostgreSQL implementation of the domain storage traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{
    CarveOut, EmergencyRecoveryUse, ImportSource, JoinCode, Meeting, Member, PasswordResetToken,
    Podcast, Rating,
};
use domain::store::{
    CarveOutStore, JoinCodeStore, MeetingStore, MemberStore, PodcastStore, RecoveryStore,
    ResetTokenStore, StoreError, StoreResult,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::{
    CarveOutRepository, JoinCodeRepository, MeetingRepository, MemberRepository,
    PodcastRepository, RecoveryRepository, ResetTokenRepository,
};

/// PostgreSQL error code for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Every repository behind the single `ClubStore` handle.
#[derive(Clone)]
pub struct PgClubStore {
    members: MemberRepository,
    join_codes: JoinCodeRepository,
    reset_tokens: ResetTokenRepository,
    recovery: RecoveryRepository,
    podcasts: PodcastRepository,
    meetings: MeetingRepository,
    carve_outs: CarveOutRepository,
}

impl PgClubStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            members: MemberRepository::new(pool.clone()),
            join_codes: JoinCodeRepository::new(pool.clone()),
            reset_tokens: ResetTokenRepository::new(pool.clone()),
            recovery: RecoveryRepository::new(pool.clone()),
            podcasts: PodcastRepository::new(pool.clone()),
            meetings: MeetingRepository::new(pool.clone()),
            carve_outs: CarveOutRepository::new(pool),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Database query failed");
    StoreError::Backend(err.to_string())
}

/// Maps a unique violation to `Duplicate` with `message`, anything else to `Backend`.
fn duplicate_as(message: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| {
        if is_unique_violation(&err) {
            StoreError::Duplicate(message.to_string())
        } else {
            backend(err)
        }
    }
}

const EMAIL_TAKEN: &str = "A member with that email already exists.";

#[async_trait]
impl MemberStore for PgClubStore {
    async fn count_members(&self) -> StoreResult<i64> {
        self.members.count().await.map_err(backend)
    }

    async fn list_members(&self) -> StoreResult<Vec<Member>> {
        self.members.list().await.map_err(backend)
    }

    async fn find_member(&self, id: Uuid) -> StoreResult<Option<Member>> {
        self.members.find_by_id(id).await.map_err(backend)
    }

    async fn find_member_by_email(&self, email: &str) -> StoreResult<Option<Member>> {
        self.members.find_by_email(email).await.map_err(backend)
    }

    async fn insert_member(&self, member: &Member) -> StoreResult<()> {
        self.members
            .insert(member)
            .await
            .map_err(duplicate_as(EMAIL_TAKEN))
    }

    async fn update_member(&self, member: &Member) -> StoreResult<bool> {
        self.members
            .update(member)
            .await
            .map_err(duplicate_as(EMAIL_TAKEN))
    }

    async fn delete_member(&self, id: Uuid) -> StoreResult<bool> {
        self.members.delete(id).await.map_err(backend)
    }
}

#[async_trait]
impl JoinCodeStore for PgClubStore {
    async fn insert_join_code(&self, code: &JoinCode) -> StoreResult<()> {
        self.join_codes
            .insert(code)
            .await
            .map_err(duplicate_as("join code collision"))
    }

    async fn consume_join_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<JoinCode>> {
        self.join_codes.consume(code_hash, now).await.map_err(backend)
    }

    async fn set_join_code_used_by(&self, id: Uuid, member_id: Uuid) -> StoreResult<()> {
        self.join_codes
            .set_used_by(id, member_id)
            .await
            .map_err(backend)
    }

    async fn release_join_code(&self, id: Uuid) -> StoreResult<()> {
        self.join_codes.release(id).await.map_err(backend)
    }

    async fn count_active_join_codes(&self) -> StoreResult<i64> {
        self.join_codes.count_active().await.map_err(backend)
    }

    async fn reassign_join_codes(&self, from: Uuid, to: Uuid) -> StoreResult<()> {
        self.join_codes.reassign(from, to).await.map_err(backend)
    }
}

#[async_trait]
impl ResetTokenStore for PgClubStore {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        self.reset_tokens
            .insert(token)
            .await
            .map_err(duplicate_as("reset token collision"))
    }

    async fn count_reset_requests_by_ip(
        &self,
        ip_hash: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.reset_tokens
            .count_by_ip(ip_hash, since)
            .await
            .map_err(backend)
    }

    async fn count_reset_requests_for_member(
        &self,
        member_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.reset_tokens
            .count_for_member(member_id, since)
            .await
            .map_err(backend)
    }

    async fn invalidate_reset_tokens(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
        unexpired_only: bool,
    ) -> StoreResult<u64> {
        self.reset_tokens
            .invalidate(member_id, now, unexpired_only)
            .await
            .map_err(backend)
    }

    async fn find_active_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasswordResetToken>> {
        self.reset_tokens
            .find_active(token_hash, now)
            .await
            .map_err(backend)
    }

    async fn delete_reset_tokens_for_member(&self, member_id: Uuid) -> StoreResult<u64> {
        self.reset_tokens
            .delete_for_member(member_id)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl RecoveryStore for PgClubStore {
    async fn find_recovery_use(
        &self,
        code_hash: &str,
    ) -> StoreResult<Option<EmergencyRecoveryUse>> {
        self.recovery.find(code_hash).await.map_err(backend)
    }

    async fn insert_recovery_use(&self, record: &EmergencyRecoveryUse) -> StoreResult<()> {
        self.recovery
            .insert(record)
            .await
            .map_err(duplicate_as("Recovery code has already been used."))
    }
}

#[async_trait]
impl PodcastStore for PgClubStore {
    async fn list_podcasts(&self) -> StoreResult<Vec<Podcast>> {
        self.podcasts.list().await.map_err(backend)
    }

    async fn find_podcast(&self, id: Uuid) -> StoreResult<Option<Podcast>> {
        self.podcasts.find_by_id(id).await.map_err(backend)
    }

    async fn insert_podcast(&self, podcast: &Podcast) -> StoreResult<()> {
        self.podcasts.insert(podcast).await.map_err(backend)
    }

    async fn update_podcast(&self, podcast: &Podcast) -> StoreResult<bool> {
        self.podcasts.update(podcast).await.map_err(backend)
    }

    async fn upsert_podcast_rating(&self, podcast_id: Uuid, rating: &Rating) -> StoreResult<bool> {
        self.podcasts
            .upsert_rating(podcast_id, rating)
            .await
            .map_err(backend)
    }

    async fn delete_podcast(&self, id: Uuid) -> StoreResult<bool> {
        self.podcasts.delete(id).await.map_err(backend)
    }

    async fn mark_podcast_discussed(
        &self,
        podcast_id: Uuid,
        meeting_id: Uuid,
    ) -> StoreResult<bool> {
        self.podcasts
            .mark_discussed(podcast_id, meeting_id)
            .await
            .map_err(backend)
    }

    async fn revert_podcast_if_discussed_at(
        &self,
        podcast_id: Uuid,
        meeting_id: Uuid,
    ) -> StoreResult<bool> {
        self.podcasts
            .revert_if_discussed_at(podcast_id, meeting_id)
            .await
            .map_err(backend)
    }

    async fn reassign_podcasts(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        self.podcasts.reassign(from, to).await.map_err(backend)
    }

    async fn remove_member_ratings(&self, member_id: Uuid) -> StoreResult<u64> {
        self.podcasts
            .remove_member_ratings(member_id)
            .await
            .map_err(backend)
    }

    async fn list_podcast_import_batches(&self, source: ImportSource) -> StoreResult<Vec<String>> {
        self.podcasts
            .list_import_batches(source)
            .await
            .map_err(backend)
    }

    async fn delete_podcasts_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
        pending_only: bool,
    ) -> StoreResult<u64> {
        self.podcasts
            .delete_by_batch(source, batch_id, pending_only)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl MeetingStore for PgClubStore {
    async fn list_meetings(&self) -> StoreResult<Vec<Meeting>> {
        self.meetings.list().await.map_err(backend)
    }

    async fn find_meeting(&self, id: Uuid) -> StoreResult<Option<Meeting>> {
        self.meetings.find_by_id(id).await.map_err(backend)
    }

    async fn find_effective_scheduled_meeting(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Meeting>> {
        self.meetings
            .find_effective_scheduled(now)
            .await
            .map_err(backend)
    }

    async fn insert_meeting(&self, meeting: &Meeting) -> StoreResult<()> {
        self.meetings.insert(meeting).await.map_err(backend)
    }

    async fn update_meeting(&self, meeting: &Meeting) -> StoreResult<bool> {
        self.meetings.update(meeting).await.map_err(backend)
    }

    async fn complete_meeting(
        &self,
        id: Uuid,
        notes: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Meeting>> {
        self.meetings.complete(id, notes, now).await.map_err(backend)
    }

    async fn delete_meeting(&self, id: Uuid) -> StoreResult<bool> {
        self.meetings.delete(id).await.map_err(backend)
    }

    async fn find_meetings_by_podcast(&self, podcast_id: Uuid) -> StoreResult<Vec<Meeting>> {
        self.meetings
            .find_by_podcast(podcast_id)
            .await
            .map_err(backend)
    }

    async fn delete_meetings(&self, ids: &[Uuid]) -> StoreResult<u64> {
        self.meetings.delete_many(ids).await.map_err(backend)
    }

    async fn reassign_meeting_hosts(&self, from: Uuid, to: Uuid) -> StoreResult<u64> {
        self.meetings.reassign_hosts(from, to).await.map_err(backend)
    }

    async fn list_meeting_import_batches(&self, source: ImportSource) -> StoreResult<Vec<String>> {
        self.meetings
            .list_import_batches(source)
            .await
            .map_err(backend)
    }

    async fn find_meetings_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> StoreResult<Vec<Meeting>> {
        self.meetings
            .find_by_batch(source, batch_id)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl CarveOutStore for PgClubStore {
    async fn list_carve_outs(&self) -> StoreResult<Vec<CarveOut>> {
        self.carve_outs.list().await.map_err(backend)
    }

    async fn find_carve_out(&self, id: Uuid) -> StoreResult<Option<CarveOut>> {
        self.carve_outs.find_by_id(id).await.map_err(backend)
    }

    async fn insert_carve_out(&self, carve_out: &CarveOut) -> StoreResult<()> {
        self.carve_outs.insert(carve_out).await.map_err(backend)
    }

    async fn update_carve_out(&self, carve_out: &CarveOut) -> StoreResult<bool> {
        self.carve_outs.update(carve_out).await.map_err(backend)
    }

    async fn delete_carve_out(&self, id: Uuid) -> StoreResult<bool> {
        self.carve_outs.delete(id).await.map_err(backend)
    }

    async fn delete_carve_outs_for_meetings(&self, meeting_ids: &[Uuid]) -> StoreResult<u64> {
        self.carve_outs
            .delete_for_meetings(meeting_ids)
            .await
            .map_err(backend)
    }

    async fn delete_carve_outs_for_member(&self, member_id: Uuid) -> StoreResult<u64> {
        self.carve_outs
            .delete_for_member(member_id)
            .await
            .map_err(backend)
    }

    async fn list_carve_out_import_batches(
        &self,
        source: ImportSource,
    ) -> StoreResult<Vec<String>> {
        self.carve_outs
            .list_import_batches(source)
            .await
            .map_err(backend)
    }

    async fn delete_carve_outs_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> StoreResult<u64> {
        self.carve_outs
            .delete_by_batch(source, batch_id)
            .await
            .map_err(backend)
    }
}
