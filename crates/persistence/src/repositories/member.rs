//! Member repository for database operations.

use domain::models::Member;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::MemberEntity;
use crate::metrics::QueryTimer;

const MEMBER_COLUMNS: &str = "id, name, email, password_hash, address_line1, address_line2, \
    city, state, postal_code, is_admin, account_status, claim_code_hash, \
    claim_code_expires_at, password_changed_at, created_at, updated_at";

/// Repository for member database operations.
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_members");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// All members ordered by name, oldest first on ties.
    pub async fn list(&self) -> Result<Vec<Member>, sqlx::Error> {
        let timer = QueryTimer::new("list_members");
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members ORDER BY name, created_at");
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Member>, sqlx::Error> {
        let timer = QueryTimer::new("find_member_by_id");
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1");
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    /// Looks up by an already lowercased email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Member>, sqlx::Error> {
        let timer = QueryTimer::new("find_member_by_email");
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM members WHERE email = $1");
        let result = sqlx::query_as::<_, MemberEntity>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    pub async fn insert(&self, member: &Member) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_member");
        let result = sqlx::query(
            r#"
            INSERT INTO members (
                id, name, email, password_hash, address_line1, address_line2, city, state,
                postal_code, is_admin, account_status, claim_code_hash, claim_code_expires_at,
                password_changed_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.password_hash)
        .bind(&member.address.address_line1)
        .bind(&member.address.address_line2)
        .bind(&member.address.city)
        .bind(&member.address.state)
        .bind(&member.address.postal_code)
        .bind(member.is_admin)
        .bind(member.account_status.as_str())
        .bind(&member.claim_code_hash)
        .bind(member.claim_code_expires_at)
        .bind(member.password_changed_at)
        .bind(member.created_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Overwrites every mutable column. Returns false when the row is gone.
    pub async fn update(&self, member: &Member) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_member");
        let result = sqlx::query(
            r#"
            UPDATE members
            SET name = $2,
                email = $3,
                password_hash = $4,
                address_line1 = $5,
                address_line2 = $6,
                city = $7,
                state = $8,
                postal_code = $9,
                is_admin = $10,
                account_status = $11,
                claim_code_hash = $12,
                claim_code_expires_at = $13,
                password_changed_at = $14,
                updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(&member.password_hash)
        .bind(&member.address.address_line1)
        .bind(&member.address.address_line2)
        .bind(&member.address.city)
        .bind(&member.address.state)
        .bind(&member.address.postal_code)
        .bind(member.is_admin)
        .bind(member.account_status.as_str())
        .bind(&member.claim_code_hash)
        .bind(member.claim_code_expires_at)
        .bind(member.password_changed_at)
        .bind(member.updated_at)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_member");
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
