//! Deletes password reset tokens that can no longer matter.
//!
//! A token stays relevant while it is redeemable and while it counts toward
//! the hourly reset request limits, so anything expired or used more than a
//! day ago is safe to drop.

use chrono::{DateTime, Duration, Utc};
use persistence::repositories::ResetTokenRepository;
use sqlx::PgPool;

use super::scheduler::{Job, JobFrequency};

/// How long expired or used tokens are kept.
const RETENTION_HOURS: i64 = 24;

pub struct ResetTokenCleanupJob {
    repo: ResetTokenRepository,
}

impl ResetTokenCleanupJob {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: ResetTokenRepository::new(pool),
        }
    }
}

fn cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(RETENTION_HOURS)
}

#[async_trait::async_trait]
impl Job for ResetTokenCleanupJob {
    fn name(&self) -> &'static str {
        "reset_token_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Hourly
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .repo
            .purge_stale(cutoff(Utc::now()))
            .await
            .map_err(|e| format!("Failed to purge reset tokens: {}", e))?;

        if deleted > 0 {
            tracing::info!(deleted, "Purged stale password reset tokens");
        }
        Ok(())
    }
}
