//! Integration tests for authentication flows.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{
    fake_name, json_request, parse_response_body, register_admin, register_member,
    registration, session_cookie, unique_email, TestApp, PASSWORD, RECOVERY_CODE,
};
use serde_json::json;

// ============================================================================
// Setup and registration
// ============================================================================

#[tokio::test]
async fn test_setup_status_flips_after_first_registration() {
    let app = TestApp::new();

    let (status, body) = app
        .call(Method::GET, "/api/auth/setup-status", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasUsers"], false);

    register_admin(&app).await;

    let (_, body) = app
        .call(Method::GET, "/api/auth/setup-status", None, None)
        .await;
    assert_eq!(body["hasUsers"], true);
}

#[tokio::test]
async fn test_first_member_is_admin_and_gets_cookie() {
    let app = TestApp::new();
    let email = unique_email();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration("Ada Admin", &email.to_uppercase(), None)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("podcast_club_session="));
    assert!(set_cookie.contains("HttpOnly"));

    let body = parse_response_body(response).await;
    assert_eq!(body["isAdmin"], true);
    assert_eq!(body["email"], email);
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_second_registration_requires_join_code() {
    let app = TestApp::new();
    register_admin(&app).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration(&fake_name(), &unique_email(), None)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "A valid one-time join code is required.");
}

#[tokio::test]
async fn test_join_code_is_single_use() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let (_, body) = app
        .call(Method::POST, "/api/join-codes", Some(&admin.cookie), None)
        .await;
    let code = body["code"].as_str().unwrap().to_string();

    let (status, member) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration(&fake_name(), &unique_email(), Some(&code))),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["isAdmin"], false);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            None,
            Some(registration(&fake_name(), &unique_email(), Some(&code))),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_rejects_short_password_and_bad_address() {
    let app = TestApp::new();

    let mut body = registration("Short Pass", &unique_email(), None);
    body["password"] = json!("short");
    let (status, _) = app
        .call(Method::POST, "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = registration("Bad State", &unique_email(), None);
    body["state"] = json!("ZZ");
    let (status, body) = app
        .call(Method::POST, "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "State must be a valid 2-letter US state code.");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Login, me and logout
// ============================================================================

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": admin.email, "password": PASSWORD })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();

    let (status, body) = app
        .call(Method::GET, "/api/auth/me", Some(&cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member"]["id"], admin.id);
    assert_eq!(body["member"]["isImpersonating"], false);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": admin.email, "password": "not the password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password.");
}

#[tokio::test]
async fn test_me_without_session() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["member"].is_null());

    let (status, _) = app
        .call(
            Method::GET,
            "/api/auth/me",
            Some("podcast_club_session=forged.token"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/logout",
            Some(&admin.cookie),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
}

// ============================================================================
// Claim and password reset
// ============================================================================

#[tokio::test]
async fn test_admin_created_member_claims_account() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let email = unique_email();

    let (status, created) = app
        .call(
            Method::POST,
            "/api/members",
            Some(&admin.cookie),
            Some(json!({
                "name": "Pending Person",
                "email": email,
                "addressLine1": "2 Oak Ave",
                "city": "Chicago",
                "state": "IL",
                "postalCode": "60601"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["accountStatus"], "pending");
    let claim_code = created["claimCode"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/claim-account",
            None,
            Some(json!({ "email": email, "claimCode": claim_code, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Account claimed. You can now log in.");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_is_generic() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let (status, known) = app
        .call(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": admin.email })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, unknown) = app
        .call(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": unique_email() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(known, unknown);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/forgot-password",
            None,
            Some(json!({ "email": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_reset_code_resets_password_once() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let (status, issued) = app
        .call(
            Method::POST,
            "/api/password-reset-codes",
            Some(&admin.cookie),
            Some(json!({ "memberId": member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issued["member"]["email"], member.email);
    let code = issued["code"].as_str().unwrap().to_string();

    let new_password = "a brand new passphrase";
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": code, "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "token": code, "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": member.email, "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_code_endpoints_require_admin() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let (status, _) = app
        .call(Method::POST, "/api/join-codes", Some(&member.cookie), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, "/api/join-codes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(Method::GET, "/api/join-codes", Some(&admin.cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["activeCodes"], 0);
}

// ============================================================================
// Emergency recovery
// ============================================================================

#[tokio::test]
async fn test_emergency_recover_with_code() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let new_password = "recovered passphrase!";

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/emergency-recover",
            None,
            Some(json!({
                "email": admin.email,
                "password": new_password,
                "recoveryCode": "wrong-code"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/emergency-recover",
            None,
            Some(json!({
                "email": admin.email,
                "password": new_password,
                "recoveryCode": RECOVERY_CODE
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": admin.email, "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Admin preview
// ============================================================================

#[tokio::test]
async fn test_preview_as_member_and_back() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/auth/preview",
            Some(&admin.cookie),
            Some(json!({ "memberId": member.id })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let preview_cookie = session_cookie(&response).unwrap();

    let (_, body) = app
        .call(Method::GET, "/api/auth/me", Some(&preview_cookie), None)
        .await;
    assert_eq!(body["member"]["id"], member.id);
    assert_eq!(body["member"]["isImpersonating"], true);
    assert_eq!(body["member"]["impersonatorId"], admin.id);

    // Rights follow the previewed member.
    let (status, _) = app
        .call(Method::GET, "/api/join-codes", Some(&preview_cookie), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = app
        .send(json_request(
            Method::DELETE,
            "/api/auth/preview",
            Some(&preview_cookie),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let restored = session_cookie(&response).unwrap();

    let (_, body) = app
        .call(Method::GET, "/api/auth/me", Some(&restored), None)
        .await;
    assert_eq!(body["member"]["id"], admin.id);
    assert_eq!(body["member"]["isImpersonating"], false);
}

#[tokio::test]
async fn test_non_admin_cannot_preview() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/preview",
            Some(&member.cookie),
            Some(json!({ "memberId": admin.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
