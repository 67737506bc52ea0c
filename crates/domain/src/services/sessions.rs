//! Resolving session cookies into members, and admin preview.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::session::{SessionClaims, SessionSigner};

use crate::error::DomainError;
use crate::models::{Member, Session};
use crate::store::ClubStore;

/// A freshly signed session value.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionService {
    store: Arc<dyn ClubStore>,
    signer: SessionSigner,
}

impl SessionService {
    pub fn new(store: Arc<dyn ClubStore>, signer: SessionSigner) -> Self {
        Self { store, signer }
    }

    pub fn issue(&self, member_id: Uuid, impersonator_id: Option<Uuid>) -> IssuedSession {
        let now = Utc::now();
        let (token, _) = self.signer.issue(member_id, impersonator_id, now);
        IssuedSession {
            token,
            expires_at: now + self.signer.ttl(),
        }
    }

    /// Any verification failure, missing member or password change after
    /// issue yields `None`.
    pub async fn resolve(&self, token: &str) -> Result<Option<Session>, DomainError> {
        let claims = match self.signer.verify(token, Utc::now()) {
            Ok(claims) => claims,
            Err(err) => {
                tracing::debug!(error = %err, "Rejected session token");
                return Ok(None);
            }
        };
        self.resolve_claims(&claims).await
    }

    async fn resolve_claims(&self, claims: &SessionClaims) -> Result<Option<Session>, DomainError> {
        let Some(member) = self.current_member(claims.member_id, claims.iat).await? else {
            return Ok(None);
        };

        let impersonator = match claims.impersonator_id {
            Some(admin_id) => match self.current_member(admin_id, claims.iat).await? {
                Some(admin) if admin.is_admin => Some(admin),
                _ => return Ok(None),
            },
            None => None,
        };

        Ok(Some(Session {
            member,
            impersonator,
            issued_at_ms: claims.iat,
        }))
    }

    async fn current_member(
        &self,
        id: Uuid,
        issued_at_ms: i64,
    ) -> Result<Option<Member>, DomainError> {
        Ok(self
            .store
            .find_member(id)
            .await?
            .filter(|m| !m.password_changed_after(issued_at_ms)))
    }

    /// Admin starts viewing the app as another member.
    pub async fn start_preview(
        &self,
        session: &Session,
        member_id: &str,
    ) -> Result<IssuedSession, DomainError> {
        if !session.is_admin() {
            return Err(DomainError::forbidden("Admin access required."));
        }
        let member_id = member_id.trim();
        if member_id.is_empty() {
            return Err(DomainError::validation("memberId is required."));
        }
        let target = Uuid::parse_str(member_id)
            .map_err(|_| DomainError::not_found("Member not found."))?;
        let target = self
            .store
            .find_member(target)
            .await?
            .ok_or_else(|| DomainError::not_found("Member not found."))?;

        tracing::info!(admin_id = %session.member_id(), member_id = %target.id, "Preview started");
        Ok(self.issue(target.id, Some(session.member_id())))
    }

    /// Returns to the original admin. A vanished or demoted admin ends the
    /// session entirely.
    pub async fn stop_preview(&self, session: &Session) -> Result<IssuedSession, DomainError> {
        let Some(impersonator) = &session.impersonator else {
            return Err(DomainError::validation(
                "Not currently previewing another member.",
            ));
        };

        let admin = self
            .store
            .find_member(impersonator.id)
            .await?
            .filter(|m| m.is_admin)
            .ok_or_else(|| {
                DomainError::Unauthenticated("Original admin session is no longer valid.".into())
            })?;

        tracing::info!(admin_id = %admin.id, "Preview stopped");
        Ok(self.issue(admin.id, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{seed_member, store};
    use crate::store::MemberStore;
    use chrono::Duration;

    fn service(store: &Arc<dyn ClubStore>) -> SessionService {
        let signer = SessionSigner::new("test-secret", Duration::days(7)).unwrap();
        SessionService::new(store.clone(), signer)
    }

    #[tokio::test]
    async fn test_resolve_round_trip() {
        let store = store();
        let bob = seed_member(&store, "Bob", false).await;
        let sessions = service(&store);

        let issued = sessions.issue(bob.id, None);
        let session = sessions.resolve(&issued.token).await.unwrap().unwrap();
        assert_eq!(session.member_id(), bob.id);
        assert!(!session.is_impersonating());

        assert!(sessions.resolve("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_change_invalidates_older_sessions() {
        let store = store();
        let mut bob = seed_member(&store, "Bob", false).await;
        let sessions = service(&store);
        let issued = sessions.issue(bob.id, None);

        bob.password_changed_at = Some(Utc::now() + Duration::seconds(1));
        store.update_member(&bob).await.unwrap();
        assert!(sessions.resolve(&issued.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleted_member_session_is_rejected() {
        let store = store();
        let bob = seed_member(&store, "Bob", false).await;
        let sessions = service(&store);
        let issued = sessions.issue(bob.id, None);

        store.delete_member(bob.id).await.unwrap();
        assert!(sessions.resolve(&issued.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_preview_flow() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        let bob = seed_member(&store, "Bob", false).await;
        let sessions = service(&store);

        let admin_session = sessions
            .resolve(&sessions.issue(admin.id, None).token)
            .await
            .unwrap()
            .unwrap();
        let preview = sessions
            .start_preview(&admin_session, &bob.id.to_string())
            .await
            .unwrap();
        let previewing = sessions.resolve(&preview.token).await.unwrap().unwrap();
        assert_eq!(previewing.member_id(), bob.id);
        assert!(!previewing.is_admin());
        let view = previewing.view();
        assert!(view.is_impersonating);
        assert_eq!(view.impersonator_name.as_deref(), Some("Admin"));

        // previewing a non-admin carries only that member's rights
        let err = sessions
            .start_preview(&previewing, &admin.id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let restored = sessions.stop_preview(&previewing).await.unwrap();
        let back = sessions.resolve(&restored.token).await.unwrap().unwrap();
        assert_eq!(back.member_id(), admin.id);
        assert!(!back.is_impersonating());

        let err = sessions.stop_preview(&back).await.unwrap_err();
        assert_eq!(err.to_string(), "Not currently previewing another member.");
    }

    #[tokio::test]
    async fn test_demoted_impersonator_ends_preview() {
        let store = store();
        let mut admin = seed_member(&store, "Admin", true).await;
        let bob = seed_member(&store, "Bob", false).await;
        let sessions = service(&store);
        let preview = sessions.issue(bob.id, Some(admin.id));
        let previewing = sessions.resolve(&preview.token).await.unwrap().unwrap();

        admin.is_admin = false;
        store.update_member(&admin).await.unwrap();

        assert!(sessions.resolve(&preview.token).await.unwrap().is_none());
        let err = sessions.stop_preview(&previewing).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_preview_requires_member_id() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        let sessions = service(&store);
        let session = sessions
            .resolve(&sessions.issue(admin.id, None).token)
            .await
            .unwrap()
            .unwrap();

        let err = sessions.start_preview(&session, " ").await.unwrap_err();
        assert_eq!(err.to_string(), "memberId is required.");
        let err = sessions
            .start_preview(&session, &Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Member not found.");
    }
}
