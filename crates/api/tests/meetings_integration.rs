//! Integration tests for the meeting lifecycle.

mod common;

use axum::http::{Method, StatusCode};
use common::{create_meeting, register_admin, register_member, submit_podcast, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_create_meeting_defaults_location_to_host_address() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/meetings",
            Some(&admin.cookie),
            Some(json!({ "date": "2099-01-15T19:00", "host": member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["host"]["id"], member.id);
    assert_eq!(body["host"]["name"], member.name);
    assert_eq!(body["location"], "1 Main St, Springfield, IL 62701");
    assert_eq!(body["status"], "scheduled");
    assert!(body["podcast"].is_null());
}

#[tokio::test]
async fn test_create_meeting_validation() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/meetings",
            Some(&member.cookie),
            Some(json!({ "date": "2099-01-15", "host": member.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/meetings",
            Some(&admin.cookie),
            Some(json!({ "date": "someday", "host": admin.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A valid date is required.");

    let (status, _) = app
        .call(
            Method::POST,
            "/api/meetings",
            Some(&admin.cookie),
            Some(json!({ "date": "2099-01-15", "host": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_meetings_list_requires_session() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    create_meeting(&app, &admin, &admin.id, "2099-02-01", None).await;

    let (status, _) = app.call(Method::GET, "/api/meetings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .call(Method::GET, "/api/meetings", Some(&admin.cookie), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_host_can_edit_but_not_reassign() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let host = register_member(&app, &admin).await;
    let other = register_member(&app, &admin).await;
    let meeting_id = create_meeting(&app, &admin, &host.id, "2099-02-01", None).await;
    let uri = format!("/api/meetings/{}", meeting_id);

    let (status, _) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&other.cookie),
            Some(json!({ "notes": "hijack" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&host.cookie),
            Some(json!({ "notes": "Bring snacks", "host": other.id, "location": "The park" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["notes"], "Bring snacks");
    assert_eq!(body["location"], "The park");
    assert_eq!(body["host"]["id"], host.id);
}

#[tokio::test]
async fn test_attach_and_detach_podcast() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let podcast_id = submit_podcast(&app, &admin, "Attach Me").await;
    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-02-01", None).await;
    let uri = format!("/api/meetings/{}", meeting_id);

    let (status, body) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "podcast": podcast_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["podcast"]["id"], podcast_id.as_str());

    // Absent field leaves the podcast alone.
    let (_, body) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "notes": "still attached" })),
        )
        .await;
    assert_eq!(body["podcast"]["id"], podcast_id.as_str());

    let (_, body) = app
        .call(
            Method::PATCH,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "podcast": null })),
        )
        .await;
    assert!(body["podcast"].is_null());
}

#[tokio::test]
async fn test_complete_meeting_marks_podcast_discussed() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let podcast_id = submit_podcast(&app, &admin, "Finale").await;
    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-03-01", Some(&podcast_id)).await;
    let uri = format!("/api/meetings/{}/complete", meeting_id);

    let (status, body) = app
        .call(Method::POST, &uri, Some(&admin.cookie), Some(json!({ "notes": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Completion notes are required.");

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "notes": "Loved it" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "completed");
    assert!(body["completedAt"].is_string());

    let (status, body) = app
        .call(
            Method::POST,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "notes": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Meeting is already completed.");

    let (_, podcasts) = app
        .call(Method::GET, "/api/podcasts", Some(&admin.cookie), None)
        .await;
    assert_eq!(podcasts[0]["status"], "discussed");
    assert_eq!(podcasts[0]["discussedMeeting"], meeting_id.as_str());
}

#[tokio::test]
async fn test_complete_requires_podcast() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-03-01", None).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/meetings/{}/complete", meeting_id),
            Some(&admin.cookie),
            Some(json!({ "notes": "Talked" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Select a podcast before completing this meeting."
    );
}

#[tokio::test]
async fn test_deleting_completed_meeting_returns_podcast_to_queue() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let podcast_id = submit_podcast(&app, &admin, "Comeback").await;
    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-04-01", Some(&podcast_id)).await;
    app.call(
        Method::POST,
        &format!("/api/meetings/{}/complete", meeting_id),
        Some(&admin.cookie),
        Some(json!({ "notes": "Done" })),
    )
    .await;
    let uri = format!("/api/meetings/{}", meeting_id);

    let (status, body) = app
        .call(Method::DELETE, &uri, Some(&admin.cookie), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Past meeting deletion requires typing DELETE.");

    let (status, body) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "confirmText": "DELETE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Meeting deleted.");

    let (_, podcasts) = app
        .call(Method::GET, "/api/podcasts", Some(&admin.cookie), None)
        .await;
    assert_eq!(podcasts[0]["status"], "pending");
    assert!(podcasts[0]["discussedMeeting"].is_null());
}

#[tokio::test]
async fn test_scheduled_meeting_deletes_without_confirmation() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-04-01", None).await;

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/meetings/{}", meeting_id),
            Some(&admin.cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/meetings/{}", meeting_id),
            Some(&admin.cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
