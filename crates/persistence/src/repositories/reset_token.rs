//! Password reset token repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::PasswordResetToken;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::PasswordResetTokenEntity;
use crate::metrics::QueryTimer;

/// Repository for password reset tokens and codes.
#[derive(Clone)]
pub struct ResetTokenRepository {
    pool: PgPool,
}

impl ResetTokenRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, token: &PasswordResetToken) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_reset_token");
        let result = sqlx::query(
            r#"
            INSERT INTO password_reset_tokens
                (id, member_id, token_hash, expires_at, used_at, requested_ip_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.member_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.used_at)
        .bind(&token.requested_ip_hash)
        .bind(token.created_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn count_by_ip(
        &self,
        ip_hash: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_reset_requests_by_ip");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM password_reset_tokens
            WHERE requested_ip_hash = $1 AND created_at >= $2
            "#,
        )
        .bind(ip_hash)
        .bind(since)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn count_for_member(
        &self,
        member_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_reset_requests_for_member");
        let result = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM password_reset_tokens
            WHERE member_id = $1 AND created_at >= $2
            "#,
        )
        .bind(member_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks the member's unused tokens as used, optionally skipping expired ones.
    pub async fn invalidate(
        &self,
        member_id: Uuid,
        now: DateTime<Utc>,
        unexpired_only: bool,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("invalidate_reset_tokens");
        let result = sqlx::query(
            r#"
            UPDATE password_reset_tokens
            SET used_at = $2
            WHERE member_id = $1
              AND used_at IS NULL
              AND (NOT $3 OR expires_at > $2)
            "#,
        )
        .bind(member_id)
        .bind(now)
        .bind(unexpired_only)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn find_active(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PasswordResetToken>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_reset_token");
        let result = sqlx::query_as::<_, PasswordResetTokenEntity>(
            r#"
            SELECT id, member_id, token_hash, expires_at, used_at, requested_ip_hash, created_at
            FROM password_reset_tokens
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    pub async fn delete_for_member(&self, member_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_reset_tokens_for_member");
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE member_id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Removes tokens that expired or were used before `cutoff`.
    pub async fn purge_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("purge_stale_reset_tokens");
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_tokens
            WHERE expires_at < $1 OR used_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }
}
