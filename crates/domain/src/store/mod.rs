//! Storage traits.
//!
//! Each trait covers one record family. Methods named `consume_*`,
//! `complete_*` and `mark_*` are conditional updates that must be atomic per
//! record. Nothing here spans more than one family in a transaction.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CarveOut, EmergencyRecoveryUse, ImportSource, JoinCode, Meeting, Member, PasswordResetToken,
    Podcast, Rating,
};

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries a caller-facing message.
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn count_members(&self) -> StoreResult<i64>;

    /// All members ordered by name.
    async fn list_members(&self) -> StoreResult<Vec<Member>>;

    async fn find_member(&self, id: Uuid) -> StoreResult<Option<Member>>;

    /// `email` must already be lowercased.
    async fn find_member_by_email(&self, email: &str) -> StoreResult<Option<Member>>;

    /// Fails with `Duplicate` when the email is taken.
    async fn insert_member(&self, member: &Member) -> StoreResult<()>;

    /// Full overwrite. Fails with `Duplicate` when the email is taken.
    async fn update_member(&self, member: &Member) -> StoreResult<bool>;

    async fn delete_member(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait JoinCodeStore: Send + Sync {
    /// Fails with `Duplicate` on a hash collision.
    async fn insert_join_code(&self, code: &JoinCode) -> StoreResult<()>;

    /// Atomically sets `used_at` on the unused code with this hash.
    async fn consume_join_code(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<JoinCode>>;

    async fn set_join_code_used_by(&self, id: Uuid, member_id: Uuid) -> StoreResult<()>;

    /// Undoes a consumption: clears `used_at` and `used_by`.
    async fn release_join_code(&self, id: Uuid) -> StoreResult<()>;

    async fn count_active_join_codes(&self) -> StoreResult<i64>;

    /// Moves `created_by` from one member to another and clears `used_by`
    /// references to `from`.
    async fn reassign_join_codes(&self, from: Uuid, to: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()>;

    async fn count_reset_requests_by_ip(
        &self,
        ip_hash: &str,
        since: DateTime<Utc>,
    ) -> StoreResult<i64>;

    async fn count_reset_requests_for_member(
        &self,
        member_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<i64>;

    /// Marks the member's unused tokens as used. With `unexpired_only`, tokens
    /// that have already expired are left alone.
    async fn invalidate_reset_tokens(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
        unexpired_only: bool,
    ) -> StoreResult<u64>;

    /// Unused, unexpired token with this hash.
    async fn find_active_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PasswordResetToken>>;

    async fn delete_reset_tokens_for_member(&self, member_id: Uuid) -> StoreResult<u64>;
}

#[async_trait]
pub trait RecoveryStore: Send + Sync {
    async fn find_recovery_use(&self, code_hash: &str)
        -> StoreResult<Option<EmergencyRecoveryUse>>;

    /// Fails with `Duplicate` when the hash was already recorded.
    async fn insert_recovery_use(&self, record: &EmergencyRecoveryUse) -> StoreResult<()>;
}

#[async_trait]
pub trait PodcastStore: Send + Sync {
    /// Newest first.
    async fn list_podcasts(&self) -> StoreResult<Vec<Podcast>>;

    async fn find_podcast(&self, id: Uuid) -> StoreResult<Option<Podcast>>;

    async fn insert_podcast(&self, podcast: &Podcast) -> StoreResult<()>;

    /// Full overwrite including ratings.
    async fn update_podcast(&self, podcast: &Podcast) -> StoreResult<bool>;

    /// Inserts or overwrites a single member's rating.
    async fn upsert_podcast_rating(&self, podcast_id: Uuid, rating: &Rating) -> StoreResult<bool>;

    async fn delete_podcast(&self, id: Uuid) -> StoreResult<bool>;

    async fn mark_podcast_discussed(&self, podcast_id: Uuid, meeting_id: Uuid)
        -> StoreResult<bool>;

    /// Reverts to pending only while the podcast still points at `meeting_id`.
    async fn revert_podcast_if_discussed_at(
        &self,
        podcast_id: Uuid,
        meeting_id: Uuid,
    ) -> StoreResult<bool>;

    async fn reassign_podcasts(&self, from: Uuid, to: Uuid) -> StoreResult<u64>;

    async fn remove_member_ratings(&self, member_id: Uuid) -> StoreResult<u64>;

    async fn list_podcast_import_batches(&self, source: ImportSource) -> StoreResult<Vec<String>>;

    async fn delete_podcasts_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
        pending_only: bool,
    ) -> StoreResult<u64>;
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Latest date first.
    async fn list_meetings(&self) -> StoreResult<Vec<Meeting>>;

    async fn find_meeting(&self, id: Uuid) -> StoreResult<Option<Meeting>>;

    /// Any meeting occupying the single upcoming slot.
    async fn find_effective_scheduled_meeting(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Meeting>>;

    async fn insert_meeting(&self, meeting: &Meeting) -> StoreResult<()>;

    async fn update_meeting(&self, meeting: &Meeting) -> StoreResult<bool>;

    /// Atomically completes a meeting that carries no completion signal yet.
    /// Returns `None` when the guard did not match.
    async fn complete_meeting(
        &self,
        id: Uuid,
        notes: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Meeting>>;

    async fn delete_meeting(&self, id: Uuid) -> StoreResult<bool>;

    async fn find_meetings_by_podcast(&self, podcast_id: Uuid) -> StoreResult<Vec<Meeting>>;

    async fn delete_meetings(&self, ids: &[Uuid]) -> StoreResult<u64>;

    async fn reassign_meeting_hosts(&self, from: Uuid, to: Uuid) -> StoreResult<u64>;

    async fn list_meeting_import_batches(&self, source: ImportSource) -> StoreResult<Vec<String>>;

    async fn find_meetings_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> StoreResult<Vec<Meeting>>;
}

#[async_trait]
pub trait CarveOutStore: Send + Sync {
    /// Newest first.
    async fn list_carve_outs(&self) -> StoreResult<Vec<CarveOut>>;

    async fn find_carve_out(&self, id: Uuid) -> StoreResult<Option<CarveOut>>;

    async fn insert_carve_out(&self, carve_out: &CarveOut) -> StoreResult<()>;

    async fn update_carve_out(&self, carve_out: &CarveOut) -> StoreResult<bool>;

    async fn delete_carve_out(&self, id: Uuid) -> StoreResult<bool>;

    async fn delete_carve_outs_for_meetings(&self, meeting_ids: &[Uuid]) -> StoreResult<u64>;

    async fn delete_carve_outs_for_member(&self, member_id: Uuid) -> StoreResult<u64>;

    async fn list_carve_out_import_batches(
        &self,
        source: ImportSource,
    ) -> StoreResult<Vec<String>>;

    async fn delete_carve_outs_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> StoreResult<u64>;
}

/// Every record family behind one handle.
pub trait ClubStore:
    MemberStore
    + JoinCodeStore
    + ResetTokenStore
    + RecoveryStore
    + PodcastStore
    + MeetingStore
    + CarveOutStore
{
}

impl<T> ClubStore for T where
    T: MemberStore
        + JoinCodeStore
        + ResetTokenStore
        + RecoveryStore
        + PodcastStore
        + MeetingStore
        + CarveOutStore
{
}

/// Distinct batch ids, descending.
pub(crate) fn sorted_batches(mut batches: Vec<String>) -> Vec<String> {
    batches.sort_by(|a, b| b.cmp(a));
    batches.dedup();
    batches
}
