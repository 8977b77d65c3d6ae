use axum::http::{Method, StatusCode};
use chat_core::testing::ScriptedTextGenerator;
use serde_json::json;
use uuid::Uuid;

mod support;

use support::{spawn_app, GUEST};

async fn guest_session(app: &support::TestApp) -> Uuid {
    let created = app
        .request(
            Method::POST,
            "/api/chat/guest/sessions",
            None,
            Some(json!({ "title": "Guest chat", "userId": GUEST.to_string() })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["title"], "Guest chat");
    Uuid::parse_str(created.body["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn guest_session_needs_the_guest_user_id() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));

    let wrong = app
        .request(
            Method::POST,
            "/api/chat/guest/sessions",
            None,
            Some(json!({ "userId": Uuid::new_v4().to_string() })),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid guest userId");

    let missing = app
        .request(
            Method::POST,
            "/api/chat/guest/sessions",
            None,
            Some(json!({ "title": "x" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let garbage = app
        .request(
            Method::POST,
            "/api/chat/guest/sessions",
            None,
            Some(json!({ "userId": "guest" })),
        )
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.session_count(), 0);

    guest_session(&app).await;
    assert_eq!(app.store.session_count(), 1);
}

#[tokio::test]
async fn guest_conversation_round_trip() {
    let app = spawn_app(ScriptedTextGenerator::replying("Hi guest"));
    let session_id = guest_session(&app).await;
    let messages_uri = format!("/api/chat/guest/sessions/{}/messages", session_id);

    let sent = app
        .request(
            Method::POST,
            &messages_uri,
            None,
            Some(json!({ "content": "hello", "userId": GUEST.to_string() })),
        )
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(sent.body["content"], "Hi guest");
    assert_eq!(sent.body["isUserMessage"], false);

    let listed = app.request(Method::GET, &messages_uri, None, None).await;
    assert_eq!(listed.status, StatusCode::OK);
    let messages = listed.body.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "hello");

    let deleted = app
        .request(
            Method::POST,
            &format!("/api/chat/guest/sessions/delete/{}", session_id),
            None,
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(
        deleted.body["message"],
        "Session and its messages deleted successfully"
    );
    assert_eq!(app.store.message_count(session_id), 0);

    let again = app
        .request(
            Method::POST,
            &format!("/api/chat/guest/sessions/delete/{}", session_id),
            None,
            None,
        )
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn guest_send_with_wrong_user_id_stores_nothing() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let session_id = guest_session(&app).await;

    let response = app
        .request(
            Method::POST,
            &format!("/api/chat/guest/sessions/{}/messages", session_id),
            None,
            Some(json!({ "content": "hello", "userId": Uuid::new_v4().to_string() })),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.message_count(session_id), 0);
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn guest_cannot_reach_registered_sessions() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let (token, _) = app.signed_in("alice@example.com", "alice").await;
    let private = app.create_session(&token, "private").await;
    let messages_uri = format!("/api/chat/guest/sessions/{}/messages", private);

    let read = app.request(Method::GET, &messages_uri, None, None).await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);

    let write = app
        .request(
            Method::POST,
            &messages_uri,
            None,
            Some(json!({ "content": "hello", "userId": GUEST.to_string() })),
        )
        .await;
    assert_eq!(write.status, StatusCode::NOT_FOUND);

    let delete = app
        .request(
            Method::POST,
            &format!("/api/chat/guest/sessions/delete/{}", private),
            None,
            None,
        )
        .await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);
    assert_eq!(app.store.session_count(), 1);
    assert_eq!(app.generator.calls(), 0);
}

#[tokio::test]
async fn registered_users_do_not_see_guest_sessions() {
    let app = spawn_app(ScriptedTextGenerator::replying("ok"));
    let guest_id = guest_session(&app).await;
    let (token, _) = app.signed_in("alice@example.com", "alice").await;

    let listed = app
        .request(Method::GET, "/api/chat/sessions", Some(&token), None)
        .await;
    assert_eq!(listed.body.as_array().map(Vec::len), Some(0));

    let read = app
        .request(
            Method::GET,
            &format!("/api/chat/sessions/{}/messages", guest_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(read.status, StatusCode::NOT_FOUND);
}
