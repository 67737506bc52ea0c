//! Authentication endpoints: registration, login, account recovery and
//! admin preview.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::{Address, MemberView};
use domain::services::accounts::FORGOT_PASSWORD_MESSAGE;
use domain::services::{IssuedSession, Registration};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminSession, ApiJson, ClientIp, CurrentSession, OptionalSession};
use crate::middleware::metrics::{record_login, record_reset_email};

/// Address fields as they appear flattened in request bodies.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFields {
    #[serde(default)]
    pub address_line1: Option<String>,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl AddressFields {
    pub fn into_address(self) -> Address {
        Address {
            address_line1: self.address_line1.unwrap_or_default(),
            address_line2: self.address_line2.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            postal_code: self.postal_code.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub invite_code: Option<String>,
    #[serde(flatten)]
    pub address: AddressFields,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimAccountRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub claim_code: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRecoverRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub recovery_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    pub member_id: String,
}

fn message(text: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": text }))
}

/// Response carrying `body` plus a fresh session cookie.
fn with_session(state: &AppState, issued: &IssuedSession, body: impl IntoResponse) -> Response {
    let mut headers = HeaderMap::new();
    state
        .cookies
        .set_session(&mut headers, &issued.token, issued.expires_at);
    (headers, body).into_response()
}

fn cleared(state: &AppState, status: StatusCode, body: impl IntoResponse) -> Response {
    let mut headers = HeaderMap::new();
    state.cookies.clear_session(&mut headers);
    (status, headers, body).into_response()
}

/// GET /api/auth/setup-status
pub async fn setup_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let has_users = state.accounts().has_members().await?;
    Ok(Json(json!({ "hasUsers": has_users })))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let member = state
        .accounts()
        .register(Registration {
            name: request.name,
            email: request.email,
            password: request.password,
            invite_code: request.invite_code,
            address: request.address.into_address(),
        })
        .await?;

    let issued = state.sessions.issue(member.id, None);
    Ok(with_session(&state, &issued, Json(MemberView::from(&member))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let member = match state.accounts().login(&request.email, &request.password).await {
        Ok(member) => member,
        Err(err) => {
            record_login("rejected");
            return Err(err.into());
        }
    };
    record_login("success");
    tracing::info!(member_id = %member.id, "Member logged in");

    let issued = state.sessions.issue(member.id, None);
    Ok(with_session(&state, &issued, Json(MemberView::from(&member))))
}

/// GET /api/auth/me
pub async fn me(OptionalSession(session): OptionalSession) -> Response {
    match session {
        Some(session) => Json(json!({ "member": session.view() })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "unauthorized",
                "message": "Authentication required.",
                "member": null
            })),
        )
            .into_response(),
    }
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    cleared(&state, StatusCode::OK, Json(json!({ "success": true })))
}

/// POST /api/auth/claim-account
pub async fn claim_account(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClaimAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .accounts()
        .claim_account(&request.email, &request.claim_code, &request.password)
        .await?;
    Ok(message("Account claimed. You can now log in."))
}

/// POST /api/auth/forgot-password
///
/// Every outcome past input validation answers with the same message.
pub async fn forgot_password(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiJson(request): ApiJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let delivery = match state
        .accounts()
        .request_password_reset(&request.email, &ip)
        .await
    {
        Ok(delivery) => delivery,
        Err(err @ domain::DomainError::Validation(_)) => return Err(err.into()),
        Err(err) => {
            tracing::error!(error = %err, "Password reset request failed");
            None
        }
    };

    if let Some(delivery) = delivery {
        let sent = state
            .email
            .send_password_reset_email(&delivery.email, &delivery.name, &delivery.token)
            .await;
        if let Err(err) = &sent {
            tracing::error!(error = %err, "Password reset email failed");
        }
        record_reset_email(sent.is_ok() && state.email.can_send());
    }

    Ok(message(FORGOT_PASSWORD_MESSAGE))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .accounts()
        .reset_password(&request.token, &request.password)
        .await?;
    Ok(message("Password reset successful. You can now log in."))
}

/// POST /api/auth/emergency-recover
pub async fn emergency_recover(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EmergencyRecoverRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .accounts()
        .emergency_recover(
            state.config.auth.recovery_code(),
            &request.email,
            &request.password,
            &request.recovery_code,
        )
        .await?;
    Ok(message(
        "Admin password reset complete. Log in with your new password and rotate OWNER_RECOVERY_CODE.",
    ))
}

/// POST /api/auth/preview
pub async fn start_preview(
    State(state): State<AppState>,
    AdminSession(session): AdminSession,
    ApiJson(request): ApiJson<PreviewRequest>,
) -> Result<Response, ApiError> {
    let issued = state
        .sessions
        .start_preview(&session, &request.member_id)
        .await?;
    Ok(with_session(&state, &issued, Json(json!({ "success": true }))))
}

/// DELETE /api/auth/preview
///
/// A vanished or demoted admin ends the session entirely.
pub async fn stop_preview(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, ApiError> {
    match state.sessions.stop_preview(&session).await {
        Ok(issued) => Ok(with_session(&state, &issued, Json(json!({ "success": true })))),
        Err(domain::DomainError::Unauthenticated(text)) => Ok(cleared(
            &state,
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized", "message": text })),
        )),
        Err(err) => Err(err.into()),
    }
}

/// Parses a path id, answering `not_found` for anything that is not a UUID.
pub(crate) fn parse_path_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(not_found.to_string()))
}
