//! Join code repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::JoinCode;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::JoinCodeEntity;
use crate::metrics::QueryTimer;

/// Repository for registration join codes.
#[derive(Clone)]
pub struct JoinCodeRepository {
    pool: PgPool,
}

impl JoinCodeRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, code: &JoinCode) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_join_code");
        let result = sqlx::query(
            r#"
            INSERT INTO join_codes (id, code_hash, created_by, used_by, used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(code.id)
        .bind(&code.code_hash)
        .bind(code.created_by)
        .bind(code.used_by)
        .bind(code.used_at)
        .bind(code.created_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Marks the unused code with this hash as used in one statement, so two
    /// concurrent registrations can never both consume it.
    pub async fn consume(
        &self,
        code_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<JoinCode>, sqlx::Error> {
        let timer = QueryTimer::new("consume_join_code");
        let result = sqlx::query_as::<_, JoinCodeEntity>(
            r#"
            UPDATE join_codes
            SET used_at = $2
            WHERE code_hash = $1 AND used_at IS NULL
            RETURNING id, code_hash, created_by, used_by, used_at, created_at
            "#,
        )
        .bind(code_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    pub async fn set_used_by(&self, id: Uuid, member_id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("set_join_code_used_by");
        let result = sqlx::query("UPDATE join_codes SET used_by = $2 WHERE id = $1")
            .bind(id)
            .bind(member_id)
            .execute(&self.pool)
            .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn release(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("release_join_code");
        let result =
            sqlx::query("UPDATE join_codes SET used_at = NULL, used_by = NULL WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn count_active(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_active_join_codes");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM join_codes WHERE used_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Hands codes created by `from` to `to` and forgets `from` as a consumer.
    pub async fn reassign(&self, from: Uuid, to: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("reassign_join_codes");
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE join_codes SET created_by = $2 WHERE created_by = $1")
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE join_codes SET used_by = NULL WHERE used_by = $1")
            .bind(from)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(())
    }
}
