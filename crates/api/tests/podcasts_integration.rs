//! Integration tests for podcast nomination, voting and ranking.

mod common;

use axum::http::{Method, StatusCode};
use common::{create_meeting, register_admin, register_member, submit_podcast, TestApp};
use serde_json::{json, Value};

fn find<'a>(list: &'a Value, id: &str) -> &'a Value {
    list.as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .unwrap()
}

#[tokio::test]
async fn test_submit_seeds_my_podcast_rating() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/podcasts",
            Some(&admin.cookie),
            Some(json!({
                "title": "  Serial  ",
                "host": "Sarah Koenig",
                "episodeCount": "12",
                "episodeNames": "Season one",
                "totalTimeMinutes": 600,
                "link": "https://serialpodcast.org"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["title"], "Serial");
    assert_eq!(body["episodeCount"], 12);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["ratings"][0]["value"], "My podcast");
    assert_eq!(body["ratings"][0]["points"], 0);
    assert_eq!(body["submittedBy"]["id"], admin.id);
    assert_eq!(body["rankingScore"], 0);
}

#[tokio::test]
async fn test_submit_validation() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;

    let (status, _) = app
        .call(
            Method::POST,
            "/api/podcasts",
            Some(&admin.cookie),
            Some(json!({ "title": "Missing everything" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/podcasts",
            Some(&admin.cookie),
            Some(json!({
                "title": "Fractional",
                "host": "Host",
                "episodeCount": 2.5,
                "episodeNames": "A",
                "totalTimeMinutes": 30,
                "link": "https://example.com"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "# of episodes must be a whole number, and total time must be at least 1 minute."
    );

    let (status, _) = app
        .call(
            Method::POST,
            "/api/podcasts",
            None,
            Some(json!({ "title": "Anonymous" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_voting_updates_score_and_missing_voters() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;
    let podcast_id = submit_podcast(&app, &admin, "Radiolab").await;
    let vote_uri = format!("/api/podcasts/{}/vote", podcast_id);

    let (_, list) = app
        .call(Method::GET, "/api/podcasts", Some(&admin.cookie), None)
        .await;
    let before = find(&list, &podcast_id);
    assert_eq!(before["missingVoters"], json!([member.name]));

    let (status, body) = app
        .call(
            Method::POST,
            &vote_uri,
            Some(&member.cookie),
            Some(json!({ "rating": "I like it a lot." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["rankingScore"], 2);
    assert_eq!(body["missingVoters"], json!([]));

    // Voting the same value again is idempotent.
    let (_, body) = app
        .call(
            Method::POST,
            &vote_uri,
            Some(&member.cookie),
            Some(json!({ "rating": "I like it a lot." })),
        )
        .await;
    assert_eq!(body["rankingScore"], 2);

    let (_, body) = app
        .call(
            Method::POST,
            &vote_uri,
            Some(&member.cookie),
            Some(json!({ "rating": "No selection" })),
        )
        .await;
    assert_eq!(body["rankingScore"], 0);
    assert_eq!(body["missingVoters"], json!([member.name]));
}

#[tokio::test]
async fn test_my_podcast_rules() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;
    let podcast_id = submit_podcast(&app, &admin, "99% Invisible").await;
    let vote_uri = format!("/api/podcasts/{}/vote", podcast_id);

    let (status, _) = app
        .call(
            Method::POST,
            &vote_uri,
            Some(&member.cookie),
            Some(json!({ "rating": "My podcast" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::POST,
            &vote_uri,
            Some(&admin.cookie),
            Some(json!({ "rating": "Meh" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::POST,
            &vote_uri,
            Some(&member.cookie),
            Some(json!({ "rating": "Love it" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A valid rating is required.");
}

#[tokio::test]
async fn test_sheet_order_puts_incomplete_first() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;

    let voted = submit_podcast(&app, &admin, "Alpha").await;
    let unvoted = submit_podcast(&app, &admin, "Beta").await;
    app.call(
        Method::POST,
        &format!("/api/podcasts/{}/vote", voted),
        Some(&member.cookie),
        Some(json!({ "rating": "I like it." })),
    )
    .await;

    let (_, list) = app
        .call(Method::GET, "/api/podcasts", Some(&member.cookie), None)
        .await;
    assert_eq!(list[0]["id"], unvoted.as_str());
    assert_eq!(list[1]["id"], voted.as_str());
}

#[tokio::test]
async fn test_public_list_shows_only_discussed_redacted() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let discussed = submit_podcast(&app, &admin, "Discussed Show").await;
    submit_podcast(&app, &admin, "Pending Show").await;

    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-05-01", Some(&discussed)).await;
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/meetings/{}/complete", meeting_id),
            Some(&admin.cookie),
            Some(json!({ "notes": "Great talk" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = app.call(Method::GET, "/api/podcasts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Discussed Show");
    assert_eq!(list[0]["submittedBy"]["name"], "Club Member");
    assert_eq!(list[0]["ratings"], json!([]));
}

#[tokio::test]
async fn test_discussed_podcast_cannot_be_rated() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;
    let podcast_id = submit_podcast(&app, &admin, "Done Show").await;

    let meeting_id = create_meeting(&app, &admin, &admin.id, "2099-05-01", Some(&podcast_id)).await;
    app.call(
        Method::POST,
        &format!("/api/meetings/{}/complete", meeting_id),
        Some(&admin.cookie),
        Some(json!({ "notes": "Done" })),
    )
    .await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/podcasts/{}/vote", podcast_id),
            Some(&member.cookie),
            Some(json!({ "rating": "Meh" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_podcast_permissions() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;
    let other = register_member(&app, &admin).await;
    let podcast_id = submit_podcast(&app, &member, "Mine").await;
    let uri = format!("/api/podcasts/{}", podcast_id);

    let (status, _) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&other.cookie),
            Some(json!({ "confirmText": "DELETE" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&member.cookie),
            Some(json!({ "confirmText": "delete" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&member.cookie),
            Some(json!({ "confirmText": "DELETE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Podcast deleted.");
    assert_eq!(body["podcast"]["title"], "Mine");

    let (status, _) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&member.cookie),
            Some(json!({ "confirmText": "DELETE" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submitter_cannot_delete_podcast_attached_to_meeting() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let member = register_member(&app, &admin).await;
    let podcast_id = submit_podcast(&app, &member, "Booked").await;
    create_meeting(&app, &admin, &member.id, "2099-07-01", Some(&podcast_id)).await;
    let uri = format!("/api/podcasts/{}", podcast_id);

    let (status, _) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&member.cookie),
            Some(json!({ "confirmText": "DELETE" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::DELETE,
            &uri,
            Some(&admin.cookie),
            Some(json!({ "confirmText": "DELETE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, meetings) = app
        .call(Method::GET, "/api/meetings", Some(&admin.cookie), None)
        .await;
    assert_eq!(meetings, json!([]));
}

#[tokio::test]
async fn test_discuss_queue_excludes_booked_podcasts() {
    let app = TestApp::new();
    let admin = register_admin(&app).await;
    let booked = submit_podcast(&app, &admin, "Booked").await;
    let free = submit_podcast(&app, &admin, "Free").await;
    create_meeting(&app, &admin, &admin.id, "2099-08-01", Some(&booked)).await;

    let (status, queue) = app
        .call(
            Method::GET,
            "/api/podcasts/discuss-queue",
            Some(&admin.cookie),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = queue
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![free.as_str()]);
}
