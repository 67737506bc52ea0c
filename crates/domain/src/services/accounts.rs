//! Account lifecycle: registration, login, claiming, password resets and
//! emergency owner recovery, plus the one-time codes that gate them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared::crypto::{
    self, constant_time_eq, hash_code, normalize_code, random_token, sha256_hex, CLAIM_CODE,
    JOIN_CODE, RESET_CODE,
};
use shared::password::{check_password_length, hash_password, verify_password};

use crate::error::DomainError;
use crate::models::{
    AccountStatus, Actor, Address, EmergencyRecoveryUse, JoinCode, Member, PasswordResetToken,
};
use crate::store::{ClubStore, StoreError};

/// Claim codes stay valid for a week.
pub const CLAIM_CODE_TTL_DAYS: i64 = 7;

/// Reset requests allowed per hashed IP per hour before silently dropping.
pub const RESET_REQUESTS_PER_IP_PER_HOUR: i64 = 20;

/// Reset requests allowed per member per hour before silently dropping.
pub const RESET_REQUESTS_PER_MEMBER_PER_HOUR: i64 = 5;

const RESET_TOKEN_BYTES: usize = 32;
const JOIN_CODE_ATTEMPTS: usize = 5;

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub invite_code: Option<String>,
    pub address: Address,
}

/// `{id, name, email}` summary returned alongside issued codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id,
            name: member.name.clone(),
            email: member.email.clone(),
        }
    }
}

/// A plaintext code shown once to an admin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub member: MemberSummary,
}

/// What the caller needs to email a reset link.
#[derive(Debug, Clone)]
pub struct ResetDelivery {
    pub email: String,
    pub name: String,
    pub token: String,
}

pub struct AccountService {
    store: Arc<dyn ClubStore>,
}

impl AccountService {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    pub async fn has_members(&self) -> Result<bool, DomainError> {
        Ok(self.store.count_members().await? > 0)
    }

    /// The first member becomes an admin without a join code. Everyone after
    /// that consumes a one-time code, which is released again if creating the
    /// member fails.
    pub async fn register(&self, input: Registration) -> Result<Member, DomainError> {
        let name = input.name.trim();
        let email = crate::models::member::normalize_email(&input.email);
        let address = input.address.normalized();

        if name.is_empty() || email.is_empty() || input.password.is_empty() {
            return Err(DomainError::validation(
                "Name, email, password, and full address are required.",
            ));
        }
        address.validate().map_err(DomainError::Validation)?;
        check_password_length(&input.password)?;

        let member_count = self.store.count_members().await?;
        let consumed = if member_count > 0 {
            Some(self.consume_join_code(input.invite_code.as_deref()).await?)
        } else {
            None
        };

        let result = self
            .create_registered_member(name, &email, &input.password, address, member_count == 0)
            .await;

        match (result, consumed) {
            (Ok(member), Some(code)) => {
                self.store.set_join_code_used_by(code.id, member.id).await?;
                tracing::info!(member_id = %member.id, "Member registered with join code");
                Ok(member)
            }
            (Ok(member), None) => {
                tracing::info!(member_id = %member.id, "First member registered as admin");
                Ok(member)
            }
            (Err(err), Some(code)) => {
                if let Err(rollback) = self.store.release_join_code(code.id).await {
                    tracing::warn!(error = %rollback, "Failed to release join code");
                }
                Err(err)
            }
            (Err(err), None) => Err(err),
        }
    }

    async fn consume_join_code(&self, raw: Option<&str>) -> Result<JoinCode, DomainError> {
        let normalized = normalize_code(raw.unwrap_or_default());
        if normalized.is_empty() {
            return Err(DomainError::forbidden(
                "A valid one-time join code is required.",
            ));
        }
        self.store
            .consume_join_code(&sha256_hex(&normalized), Utc::now())
            .await?
            .ok_or_else(|| DomainError::forbidden("Invalid or already used join code."))
    }

    async fn create_registered_member(
        &self,
        name: &str,
        email: &str,
        password: &str,
        address: Address,
        is_first: bool,
    ) -> Result<Member, DomainError> {
        if let Some(existing) = self.store.find_member_by_email(email).await? {
            let message = if existing.is_pending() {
                "An admin already created this account. Use Claim Account to set your password instead of registering again."
            } else {
                "A member with this email already exists."
            };
            return Err(DomainError::conflict(message));
        }

        let mut member = Member::new(name, email, address, Utc::now());
        member.password_hash = Some(hash_password(password)?);
        member.is_admin = is_first;
        self.store.insert_member(&member).await?;
        Ok(member)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Member, DomainError> {
        let email = crate::models::member::normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(DomainError::validation("Email and password are required."));
        }

        let invalid = || DomainError::Unauthenticated("Invalid email or password.".to_string());
        let member = self
            .store
            .find_member_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        let Some(hash) = member.password_hash.as_deref().filter(|_| !member.is_pending()) else {
            return Err(DomainError::forbidden(
                "This account has not been claimed yet. Use Claim Account to set your password.",
            ));
        };

        if !verify_password(password, hash)? {
            return Err(invalid());
        }
        Ok(member)
    }

    /// Sets the first password on a pending account using its claim code.
    pub async fn claim_account(
        &self,
        email: &str,
        claim_code: &str,
        password: &str,
    ) -> Result<(), DomainError> {
        let email = crate::models::member::normalize_email(email);
        let code = normalize_code(claim_code);
        if email.is_empty() || code.is_empty() || password.is_empty() {
            return Err(DomainError::validation(
                "Email, claim code, and password are required.",
            ));
        }
        check_password_length(password)?;

        let invalid = || DomainError::validation("Invalid claim attempt.");
        let mut member = self
            .store
            .find_member_by_email(&email)
            .await?
            .ok_or_else(invalid)?;

        let (Some(stored_hash), Some(expires_at)) =
            (member.claim_code_hash.clone(), member.claim_code_expires_at)
        else {
            return Err(invalid());
        };
        if !member.is_pending() {
            return Err(invalid());
        }

        let now = Utc::now();
        if expires_at <= now {
            return Err(DomainError::validation(
                "Claim code expired. Contact an admin for a new code.",
            ));
        }
        if !constant_time_eq(stored_hash.as_bytes(), sha256_hex(&code).as_bytes()) {
            return Err(invalid());
        }

        member.password_hash = Some(hash_password(password)?);
        member.account_status = AccountStatus::Claimed;
        member.claim_code_hash = None;
        member.claim_code_expires_at = None;
        member.password_changed_at = Some(now);
        member.updated_at = now;
        self.store.update_member(&member).await?;

        tracing::info!(member_id = %member.id, "Account claimed");
        Ok(())
    }

    /// Issues a reset link token. Returns `None` whenever nothing should be
    /// sent: unknown email or either rate limit tripped.
    pub async fn request_password_reset(
        &self,
        email: &str,
        requester_ip: &str,
    ) -> Result<Option<ResetDelivery>, DomainError> {
        let email = crate::models::member::normalize_email(email);
        if email.is_empty() {
            return Err(DomainError::validation("Email is required."));
        }

        let now = Utc::now();
        let hour_ago = now - Duration::hours(1);
        let ip_hash = sha256_hex(requester_ip);

        if self
            .store
            .count_reset_requests_by_ip(&ip_hash, hour_ago)
            .await?
            > RESET_REQUESTS_PER_IP_PER_HOUR
        {
            tracing::warn!("Password reset IP limit reached");
            return Ok(None);
        }

        let Some(member) = self.store.find_member_by_email(&email).await? else {
            return Ok(None);
        };

        if self
            .store
            .count_reset_requests_for_member(member.id, hour_ago)
            .await?
            > RESET_REQUESTS_PER_MEMBER_PER_HOUR
        {
            tracing::warn!(member_id = %member.id, "Password reset member limit reached");
            return Ok(None);
        }

        self.store
            .invalidate_reset_tokens(member.id, now, false)
            .await?;

        let token = random_token(RESET_TOKEN_BYTES);
        let record = PasswordResetToken::new(member.id, sha256_hex(&token), Some(ip_hash), now);
        self.store.insert_reset_token(&record).await?;

        tracing::info!(member_id = %member.id, "Password reset link issued");
        Ok(Some(ResetDelivery {
            email: member.email,
            name: member.name,
            token,
        }))
    }

    /// Admin-issued reset code for in-person handoff.
    pub async fn issue_reset_code(&self, member_id: &str) -> Result<IssuedCode, DomainError> {
        let member = self.load_target_member(member_id).await?;
        let now = Utc::now();

        self.store
            .invalidate_reset_tokens(member.id, now, true)
            .await?;

        let code = RESET_CODE.generate();
        let record = PasswordResetToken::new(member.id, code.code_hash, None, now);
        self.store.insert_reset_token(&record).await?;

        tracing::info!(member_id = %member.id, "Password reset code issued");
        Ok(IssuedCode {
            code: code.code,
            expires_at: record.expires_at,
            member: MemberSummary::from(&member),
        })
    }

    /// Accepts either an emailed token or an admin code.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), DomainError> {
        let token = token.trim();
        if token.is_empty() || password.is_empty() {
            return Err(DomainError::validation("Token and password are required."));
        }
        check_password_length(password)?;

        let now = Utc::now();
        let record = match self
            .store
            .find_active_reset_token(&sha256_hex(token), now)
            .await?
        {
            Some(record) => Some(record),
            None => {
                self.store
                    .find_active_reset_token(&hash_code(token), now)
                    .await?
            }
        };
        let record =
            record.ok_or_else(|| DomainError::validation("Invalid or expired reset token."))?;

        let mut member = self
            .store
            .find_member(record.member_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account not found."))?;

        member.password_hash = Some(hash_password(password)?);
        member.password_changed_at = Some(now);
        member.updated_at = now;
        self.store.update_member(&member).await?;

        self.store
            .invalidate_reset_tokens(member.id, now, false)
            .await?;

        tracing::info!(member_id = %member.id, "Password reset completed");
        Ok(())
    }

    /// Resets an admin password with the operator's recovery code. Each
    /// configured code value works exactly once.
    pub async fn emergency_recover(
        &self,
        configured_code: Option<&str>,
        email: &str,
        password: &str,
        recovery_code: &str,
    ) -> Result<(), DomainError> {
        let configured = normalize_code(configured_code.unwrap_or_default());
        if configured.is_empty() {
            return Err(DomainError::ServiceUnavailable(
                "Emergency recovery is not configured.".to_string(),
            ));
        }

        let email = crate::models::member::normalize_email(email);
        let input = normalize_code(recovery_code);
        if email.is_empty() || password.is_empty() || input.is_empty() {
            return Err(DomainError::validation(
                "Email, password, and recovery code are required.",
            ));
        }
        check_password_length(password)?;

        let configured_hash = sha256_hex(&configured);
        if !constant_time_eq(sha256_hex(&input).as_bytes(), configured_hash.as_bytes()) {
            tracing::warn!("Emergency recovery rejected: wrong code");
            return Err(DomainError::forbidden("Invalid recovery code."));
        }

        let exhausted = || {
            DomainError::forbidden(
                "This emergency recovery code has already been used. Rotate OWNER_RECOVERY_CODE.",
            )
        };
        if self
            .store
            .find_recovery_use(&configured_hash)
            .await?
            .is_some()
        {
            return Err(exhausted());
        }

        let mut member = self
            .store
            .find_member_by_email(&email)
            .await?
            .filter(|m| m.is_admin)
            .ok_or_else(|| DomainError::not_found("Admin account not found for this email."))?;

        let now = Utc::now();
        member.password_hash = Some(hash_password(password)?);
        member.password_changed_at = Some(now);
        member.updated_at = now;
        self.store.update_member(&member).await?;

        self.store
            .invalidate_reset_tokens(member.id, now, false)
            .await?;

        let record = EmergencyRecoveryUse {
            id: Uuid::new_v4(),
            code_hash: configured_hash,
            used_at: now,
            used_by: member.id,
        };
        match self.store.insert_recovery_use(&record).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(exhausted()),
            Err(err) => return Err(err.into()),
        }

        tracing::warn!(member_id = %member.id, "Emergency recovery used");
        Ok(())
    }

    /// Generates a join code, retrying on hash collisions.
    pub async fn generate_join_code(&self, actor: Actor) -> Result<String, DomainError> {
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = JOIN_CODE.generate();
            let record = JoinCode::new(code.code_hash, actor.id, Utc::now());
            match self.store.insert_join_code(&record).await {
                Ok(()) => {
                    tracing::info!(created_by = %actor.id, "Join code generated");
                    return Ok(code.code);
                }
                Err(StoreError::Duplicate(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(DomainError::Storage(
            "Unable to generate a unique join code. Try again.".to_string(),
        ))
    }

    pub async fn count_active_join_codes(&self) -> Result<i64, DomainError> {
        Ok(self.store.count_active_join_codes().await?)
    }

    /// Replaces the claim code on a pending account.
    pub async fn issue_claim_code(&self, member_id: &str) -> Result<IssuedCode, DomainError> {
        let mut member = self.load_target_member(member_id).await?;
        if !member.is_pending() {
            return Err(DomainError::validation(
                "Only pending accounts can receive claim codes.",
            ));
        }

        let (code, expires_at) = new_claim_code(&mut member, Utc::now());
        self.store.update_member(&member).await?;

        tracing::info!(member_id = %member.id, "Claim code issued");
        Ok(IssuedCode {
            code,
            expires_at,
            member: MemberSummary::from(&member),
        })
    }

    async fn load_target_member(&self, raw_id: &str) -> Result<Member, DomainError> {
        let raw_id = raw_id.trim();
        if raw_id.is_empty() {
            return Err(DomainError::validation("memberId is required."));
        }
        let id = Uuid::parse_str(raw_id).map_err(|_| DomainError::not_found("Member not found."))?;
        self.store
            .find_member(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Member not found."))
    }
}

/// Stamps a fresh claim code onto `member` and returns the plaintext.
pub(crate) fn new_claim_code(member: &mut Member, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
    let crypto::OneTimeCode { code, code_hash } = CLAIM_CODE.generate();
    let expires_at = now + Duration::days(CLAIM_CODE_TTL_DAYS);
    member.claim_code_hash = Some(code_hash);
    member.claim_code_expires_at = Some(expires_at);
    member.updated_at = now;
    (code, expires_at)
}
