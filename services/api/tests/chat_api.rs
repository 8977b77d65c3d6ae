use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chat_core::{
    chat::{RATE_LIMITED_REPLY, TROUBLE_REPLY, UNAVAILABLE_REPLY},
    testing::ScriptedTextGenerator,
    GenerationError,
};
use serde_json::json;
use uuid::Uuid;

mod support;

use support::spawn_app;

#[tokio::test]
async fn chat_routes_require_a_valid_bearer_token() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));

    let missing = app
        .request(Method::GET, "/api/chat/sessions", None, None)
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["statusCode"], 401);

    let garbage = app
        .request(Method::GET, "/api/chat/sessions", Some("not.a.jwt"), None)
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn hi_produces_user_and_assistant_messages() {
    let app = spawn_app(ScriptedTextGenerator::replying("Hello! How can I help?"));
    let (token, _) = app.signed_in("alice@example.com", "alice").await;
    let session_id = app.create_session(&token, "First chat").await;

    let sent = app
        .request(
            Method::POST,
            &format!("/api/chat/sessions/{}/messages", session_id),
            Some(&token),
            Some(json!({ "content": "hi" })),
        )
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.body["isUserMessage"], false);
    assert_eq!(sent.body["content"], "Hello! How can I help?");

    let listed = app
        .request(
            Method::GET,
            &format!("/api/chat/sessions/{}/messages", session_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    let messages = listed.body.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[0]["isUserMessage"], true);
    assert_eq!(messages[1]["isUserMessage"], false);
    assert_eq!(app.generator.calls(), 1);
}

#[tokio::test]
async fn generation_failures_still_store_two_rows() {
    let cases = [
        (GenerationError::RateLimited, RATE_LIMITED_REPLY),
        (GenerationError::Unavailable, UNAVAILABLE_REPLY),
        (GenerationError::Other("timeout".to_string()), TROUBLE_REPLY),
    ];
    for (failure, expected) in cases {
        let app = spawn_app(ScriptedTextGenerator::failing(failure));
        let (token, _) = app.signed_in("alice@example.com", "alice").await;
        let session_id = app.create_session(&token, "t").await;

        let sent = app
            .request(
                Method::POST,
                &format!("/api/chat/sessions/{}/messages", session_id),
                Some(&token),
                Some(json!({ "content": "hi" })),
            )
            .await;

        assert_eq!(sent.status, StatusCode::OK);
        assert_eq!(sent.body["content"], expected);
        assert_eq!(app.store.message_count(session_id), 2);
    }
}

#[tokio::test]
async fn sessions_are_listed_newest_first_and_default_title() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let (token, _) = app.signed_in("alice@example.com", "alice").await;

    let untitled = app
        .request(
            Method::POST,
            "/api/chat/sessions",
            Some(&token),
            Some(json!({})),
        )
        .await;
    assert_eq!(untitled.status, StatusCode::CREATED);
    assert_eq!(untitled.body["title"], "New Chat");
    let newer = app.create_session(&token, "Trip planning").await;

    let listed = app
        .request(Method::GET, "/api/chat/sessions", Some(&token), None)
        .await;
    let sessions = listed.body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["id"], newer.to_string());
    assert!(sessions[0]["createdAt"].is_string());
}

#[tokio::test]
async fn long_title_and_empty_message_are_rejected() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let (token, _) = app.signed_in("alice@example.com", "alice").await;

    let long_title = app
        .request(
            Method::POST,
            "/api/chat/sessions",
            Some(&token),
            Some(json!({ "title": "x".repeat(101) })),
        )
        .await;
    assert_eq!(long_title.status, StatusCode::BAD_REQUEST);

    let session_id = app.create_session(&token, "t").await;
    let empty = app
        .request(
            Method::POST,
            &format!("/api/chat/sessions/{}/messages", session_id),
            Some(&token),
            Some(json!({ "content": "" })),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.message_count(session_id), 0);
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn other_users_cannot_touch_a_session() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let (alice, _) = app.signed_in("alice@example.com", "alice").await;
    let (bob, _) = app.signed_in("bob@example.com", "bob").await;
    let session_id = app.create_session(&alice, "private").await;
    let messages_uri = format!("/api/chat/sessions/{}/messages", session_id);

    let read = app.request(Method::GET, &messages_uri, Some(&bob), None).await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);

    let write = app
        .request(
            Method::POST,
            &messages_uri,
            Some(&bob),
            Some(json!({ "content": "hi" })),
        )
        .await;
    assert_eq!(write.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.message_count(session_id), 0);

    let delete = app
        .request(
            Method::DELETE,
            &format!("/api/chat/sessions/{}", session_id),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.session_count(), 1);

    let bob_sessions = app
        .request(Method::GET, "/api/chat/sessions", Some(&bob), None)
        .await;
    assert_eq!(bob_sessions.body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn deleting_a_session_removes_its_messages() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let (token, _) = app.signed_in("alice@example.com", "alice").await;
    let session_id = app.create_session(&token, "t").await;
    app.request(
        Method::POST,
        &format!("/api/chat/sessions/{}/messages", session_id),
        Some(&token),
        Some(json!({ "content": "hi" })),
    )
    .await;
    assert_eq!(app.store.message_count(session_id), 2);

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/chat/sessions/{}", session_id),
            Some(&token),
            None,
        )
        .await;

    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(app.store.message_count(session_id), 0);
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn bulk_delete_skips_foreign_ids() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let (alice, _) = app.signed_in("alice@example.com", "alice").await;
    let (bob, _) = app.signed_in("bob@example.com", "bob").await;
    let mine = app.create_session(&alice, "mine").await;
    let also_mine = app.create_session(&alice, "also mine").await;
    let theirs = app.create_session(&bob, "theirs").await;

    let response = app
        .request(
            Method::DELETE,
            "/api/chat/sessions",
            Some(&alice),
            Some(json!([mine, also_mine, theirs, Uuid::new_v4()])),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["message"],
        "2 session(s) and their messages deleted successfully"
    );
    assert_eq!(app.store.session_count(), 1);

    let nothing = app
        .request(Method::DELETE, "/api/chat/sessions", Some(&alice), Some(json!([])))
        .await;
    assert_eq!(nothing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generate_sample_takes_a_bare_json_string() {
    let app = spawn_app(ScriptedTextGenerator::replying("A haiku about rust"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat/generate-sample")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("\"write a haiku\""))
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["response"], "A haiku about rust");
    assert_eq!(app.store.session_count(), 0);
}

#[tokio::test]
async fn generate_sample_falls_back_on_failure() {
    let app = spawn_app(ScriptedTextGenerator::failing(GenerationError::RateLimited));
    let response = app
        .request(
            Method::POST,
            "/api/chat/generate-sample",
            None,
            Some(json!("hello")),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["response"], RATE_LIMITED_REPLY);
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));

    let health = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body, json!({ "status": "Healthy" }));

    let doc = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(doc.status, StatusCode::OK);
    assert!(doc.body["paths"]["/api/chat/sessions"].is_object());
}

#[tokio::test]
async fn openapi_is_hidden_in_production() {
    let app = support::spawn_app_with_config(
        ScriptedTextGenerator::replying("ok"),
        support::test_config(&[("APP_ENV", "production")]),
    );

    let doc = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(doc.status, StatusCode::NOT_FOUND);
}
