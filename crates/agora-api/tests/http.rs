use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use agora_api::{AppState, AppStateInner};

fn test_app() -> Router {
    let db = agora_db::Database::open_in_memory().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: "test-secret".into(),
        token_ttl_days: 7,
    });
    agora_api::router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, username: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

async fn create_post(app: &Router, token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/posts",
        Some(token),
        Some(json!({ "title": title, "content": "some content" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_issues_token_and_rejects_duplicate_email() {
    let app = test_app();

    let token = register(&app, "alice", "alice@example.com").await;
    assert!(!token.is_empty());

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice2", "email": "alice@example.com", "password": "password456" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn register_validates_input() {
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "al", "email": "al@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "username": "alice", "email": "not-an-email", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_succeeds_and_fails_with_generic_error() {
    let app = test_app();
    register(&app, "alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().unwrap().len() > 20);

    // wrong password and unknown email produce the same message
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn mutation_requires_a_token() {
    let app = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/posts",
        None,
        Some(json!({ "title": "t", "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/api/posts",
        Some("garbage-token"),
        Some(json!({ "title": "t", "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_the_author_may_update_a_post() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;
    let bob = register(&app, "bob", "bob@example.com").await;

    let post_id = create_post(&app, &alice, "Original title").await;

    let update = json!({ "title": "Edited title", "content": "edited" });
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}"),
        Some(&bob),
        Some(update.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/posts/{post_id}"),
        Some(&alice),
        Some(update),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Edited title");
    assert_eq!(body["data"]["author_username"], "alice");
}

#[tokio::test]
async fn comments_and_replies_come_back_as_a_tree() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;
    let post_id = create_post(&app, &alice, "Discussion").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments"),
        Some(&alice),
        Some(json!({ "content": "first comment" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/comments/{comment_id}/replies"),
        Some(&alice),
        Some(json!({ "content": "a reply" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["parent_id"], comment_id.as_str());

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/posts/{post_id}/comments"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["pages"], 1);
    let top = &body["data"][0];
    assert_eq!(top["content"], "first comment");
    assert_eq!(top["replies"][0]["content"], "a reply");
    assert_eq!(top["replies"][0]["replies"], json!([]));
}

#[tokio::test]
async fn commenting_on_a_missing_post_is_404() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/posts/00000000-0000-0000-0000-00000000dead/comments",
        Some(&alice),
        Some(json!({ "content": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
}

#[tokio::test]
async fn voting_cycles_through_cast_removed_changed() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;
    let bob = register(&app, "bob", "bob@example.com").await;
    let post_id = create_post(&app, &alice, "Vote on me").await;

    let uri = format!("/api/posts/{post_id}/vote");

    let (status, body) = send(&app, "POST", &uri, Some(&bob), Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Vote cast");
    assert_eq!(body["data"]["value"], 1);

    let (status, body) = send(&app, "POST", &uri, Some(&bob), Some(json!({ "value": 1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vote removed");
    assert!(body.get("data").is_none());

    send(&app, "POST", &uri, Some(&bob), Some(json!({ "value": 1 }))).await;
    let (status, body) = send(&app, "POST", &uri, Some(&bob), Some(json!({ "value": -1 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Vote changed");
    assert_eq!(body["data"]["value"], -1);

    // denormalized counters follow the ledger
    let (status, body) = send(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["upvotes"], 0);
    assert_eq!(body["data"]["downvotes"], 1);
}

#[tokio::test]
async fn vote_value_and_target_are_validated() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;
    let post_id = create_post(&app, &alice, "Vote on me").await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/vote"),
        Some(&alice),
        Some(json!({ "value": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/comments/00000000-0000-0000-0000-00000000dead/vote",
        Some(&alice),
        Some(json!({ "value": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Comment not found");
}

#[tokio::test]
async fn deleting_a_post_takes_its_comments_along() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;
    let bob = register(&app, "bob", "bob@example.com").await;
    let post_id = create_post(&app, &alice, "Short-lived").await;

    send(
        &app,
        "POST",
        &format!("/api/posts/{post_id}/comments"),
        Some(&bob),
        Some(json!({ "content": "soon gone" })),
    )
    .await;

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/posts/{post_id}"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", &format!("/api/posts/{post_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/posts/{post_id}/comments"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn post_listing_searches_and_paginates() {
    let app = test_app();
    let alice = register(&app, "alice", "alice@example.com").await;
    let bob = register(&app, "bob", "bob@example.com").await;

    create_post(&app, &alice, "Rust ownership explained").await;
    create_post(&app, &bob, "Sourdough starters").await;
    create_post(&app, &bob, "Advanced rust lifetimes").await;

    let (status, body) = send(&app, "GET", "/api/posts?search=rust", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["count"], 2);

    let (status, body) = send(&app, "GET", "/api/posts?page=1&limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["pages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    // newest first by default
    assert_eq!(body["data"][0]["title"], "Advanced rust lifetimes");
}
