//! Session cookie extractors.
//!
//! The cookie is resolved at most once per request; the result is cached in
//! the request extensions so several extractors can share it.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::{Actor, Session};

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::cookies::session_token;

#[derive(Clone)]
struct ResolvedSession(Option<Session>);

async fn resolve(parts: &mut Parts, state: &AppState) -> Result<Option<Session>, ApiError> {
    if let Some(ResolvedSession(session)) = parts.extensions.get::<ResolvedSession>() {
        return Ok(session.clone());
    }

    let session = match session_token(&parts.headers) {
        Some(token) => state.sessions.resolve(token).await?,
        None => None,
    };

    parts
        .extensions
        .insert(ResolvedSession(session.clone()));
    Ok(session)
}

/// A signed-in member. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl CurrentSession {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await?
            .map(CurrentSession)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required.".to_string()))
    }
}

/// A signed-in admin, judged by the member being viewed as. 401 without a
/// session, 403 for non-admins.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl AdminSession {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        if !session.is_admin() {
            return Err(ApiError::Forbidden("Admin access required.".to_string()));
        }
        Ok(AdminSession(session))
    }
}

/// Session when present; public endpoints serve a redacted view otherwise.
#[derive(Debug, Clone)]
pub struct OptionalSession(pub Option<Session>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(resolve(parts, state).await?))
    }
}
