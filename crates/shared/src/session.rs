//! Signed session tokens.
//!
//! A session is an immutable value: `base64url(json claims) "." base64url(hmac)`.
//! Nothing is stored server side; starting or stopping an admin preview simply
//! issues a new token.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Errors produced while signing or verifying a session token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session secret is not configured")]
    MissingSecret,

    #[error("Malformed session token")]
    Malformed,

    #[error("Invalid session signature")]
    InvalidSignature,

    #[error("Session expired")]
    Expired,
}

/// Claims carried by a session token. Timestamps are milliseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub member_id: Uuid,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonator_id: Option<Uuid>,
}

impl SessionClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.iat)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.exp)
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonator_id.is_some()
    }
}

/// Issues and verifies session tokens with a server-side HMAC key.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Creates a signer. An empty secret is rejected.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::MissingSecret);
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
            .map_err(|_| SessionError::MissingSecret)?;
        Ok(Self { mac, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds claims for `member_id` starting at `now` and signs them.
    pub fn issue(
        &self,
        member_id: Uuid,
        impersonator_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> (String, SessionClaims) {
        let claims = SessionClaims {
            member_id,
            iat: now.timestamp_millis(),
            exp: (now + self.ttl).timestamp_millis(),
            impersonator_id,
        };
        (self.sign(&claims), claims)
    }

    pub fn sign(&self, claims: &SessionClaims) -> String {
        // Serializing a plain struct of uuids and integers cannot fail.
        let json = serde_json::to_vec(claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&payload).finalize().into_bytes());
        format!("{}.{}", payload, signature)
    }

    /// Verifies signature, structure and expiry.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, SessionError> {
        let (payload, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        if payload.is_empty() || signature.is_empty() {
            return Err(SessionError::Malformed);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::InvalidSignature)?;
        self.mac(payload)
            .verify_slice(&signature)
            .map_err(|_| SessionError::InvalidSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| SessionError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)?;

        if claims.iat <= 0 || claims.exp <= 0 {
            return Err(SessionError::Malformed);
        }
        if claims.exp < now.timestamp_millis() {
            return Err(SessionError::Expired);
        }

        Ok(claims)
    }

    fn mac(&self, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac
    }
}
