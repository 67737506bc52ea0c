//! Carve out repository for database operations.

use domain::models::{CarveOut, ImportSource};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::CarveOutEntity;
use crate::metrics::QueryTimer;

const CARVE_OUT_COLUMNS: &str = "id, title, type, url, notes, member_id, meeting_id, \
    import_source, import_batch_id, created_at, updated_at";

/// Repository for carve out database operations.
#[derive(Clone)]
pub struct CarveOutRepository {
    pool: PgPool,
}

impl CarveOutRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<CarveOut>, sqlx::Error> {
        let timer = QueryTimer::new("list_carve_outs");
        let sql = format!("SELECT {CARVE_OUT_COLUMNS} FROM carve_outs ORDER BY created_at DESC");
        let result = sqlx::query_as::<_, CarveOutEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CarveOut>, sqlx::Error> {
        let timer = QueryTimer::new("find_carve_out_by_id");
        let sql = format!("SELECT {CARVE_OUT_COLUMNS} FROM carve_outs WHERE id = $1");
        let result = sqlx::query_as::<_, CarveOutEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    pub async fn insert(&self, carve_out: &CarveOut) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_carve_out");
        let result = sqlx::query(
            r#"
            INSERT INTO carve_outs (
                id, title, type, url, notes, member_id, meeting_id,
                import_source, import_batch_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(carve_out.id)
        .bind(&carve_out.title)
        .bind(carve_out.carve_out_type.as_str())
        .bind(&carve_out.url)
        .bind(&carve_out.notes)
        .bind(carve_out.member_id)
        .bind(carve_out.meeting_id)
        .bind(carve_out.import.as_ref().map(|t| t.source.as_str()))
        .bind(carve_out.import.as_ref().map(|t| t.batch_id.as_str()))
        .bind(carve_out.created_at)
        .bind(carve_out.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn update(&self, carve_out: &CarveOut) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_carve_out");
        let result = sqlx::query(
            r#"
            UPDATE carve_outs
            SET title = $2,
                type = $3,
                url = $4,
                notes = $5,
                member_id = $6,
                meeting_id = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(carve_out.id)
        .bind(&carve_out.title)
        .bind(carve_out.carve_out_type.as_str())
        .bind(&carve_out.url)
        .bind(&carve_out.notes)
        .bind(carve_out.member_id)
        .bind(carve_out.meeting_id)
        .bind(carve_out.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_carve_out");
        let result = sqlx::query("DELETE FROM carve_outs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn delete_for_meetings(&self, meeting_ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        if meeting_ids.is_empty() {
            return Ok(0);
        }
        let timer = QueryTimer::new("delete_carve_outs_for_meetings");
        let result = sqlx::query("DELETE FROM carve_outs WHERE meeting_id = ANY($1)")
            .bind(meeting_ids)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    pub async fn delete_for_member(&self, member_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_carve_outs_for_member");
        let result = sqlx::query("DELETE FROM carve_outs WHERE member_id = $1")
            .bind(member_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    /// Distinct batch ids for `source`, descending.
    pub async fn list_import_batches(
        &self,
        source: ImportSource,
    ) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("list_carve_out_import_batches");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT import_batch_id COLLATE "C" AS batch_id
            FROM carve_outs
            WHERE import_source = $1 AND import_batch_id IS NOT NULL
            ORDER BY batch_id DESC
            "#,
        )
        .bind(source.as_str())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_by_batch(
        &self,
        source: ImportSource,
        batch_id: &str,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_carve_outs_by_batch");
        let result = sqlx::query(
            "DELETE FROM carve_outs WHERE import_source = $1 AND import_batch_id = $2",
        )
        .bind(source.as_str())
        .bind(batch_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
