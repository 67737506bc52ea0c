//! Emergency recovery repository.

use domain::models::EmergencyRecoveryUse;
use sqlx::PgPool;

use crate::entities::EmergencyRecoveryUseEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct RecoveryRepository {
    pool: PgPool,
}

impl RecoveryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, code_hash: &str) -> Result<Option<EmergencyRecoveryUse>, sqlx::Error> {
        let timer = QueryTimer::new("find_recovery_use");
        let result = sqlx::query_as::<_, EmergencyRecoveryUseEntity>(
            "SELECT id, code_hash, used_at, used_by FROM emergency_recovery_uses WHERE code_hash = $1",
        )
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// The unique index on `code_hash` rejects a second use.
    pub async fn insert(&self, record: &EmergencyRecoveryUse) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_recovery_use");
        let result = sqlx::query(
            r#"
            INSERT INTO emergency_recovery_uses (id, code_hash, used_at, used_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id)
        .bind(&record.code_hash)
        .bind(record.used_at)
        .bind(record.used_by)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
