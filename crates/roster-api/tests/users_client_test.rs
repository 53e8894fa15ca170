#![allow(clippy::unwrap_used)]
// Integration tests for `UsersClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use roster_api::{Error, UpsertOutcome, UsersClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, UsersClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = UsersClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Listing tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_unfiltered_sends_no_query_param() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param_is_missing("q"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": 1, "name": "Ada", "email": "ada@x.com" },
                { "id": 2, "name": "Grace", "email": "grace@x.com" }
            ]
        })))
        .mount(&server)
        .await;

    let users = client.list("").await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].name, "Ada");
    assert_eq!(users[1].email, "grace@x.com");
}

#[tokio::test]
async fn test_list_filtered() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("q", "ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{ "id": 1, "name": "Ada", "email": "ada@x.com" }]
        })))
        .mount(&server)
        .await;

    let users = client.list("ada").await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 1);
}

#[tokio::test]
async fn test_list_missing_users_key_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let users = client.list("").await.unwrap();

    assert!(users.is_empty());
}

#[tokio::test]
async fn test_list_server_error_with_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "database offline" })),
        )
        .mount(&server)
        .await;

    let result = client.list("").await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database offline");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_list_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client.list("").await;

    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

// ── Create tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(body_json(json!({ "name": "Ada", "email": "ada@x.com" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.create("Ada", "ada@x.com").await.unwrap();
}

#[tokio::test]
async fn test_create_duplicate_email_conflict() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "email already exists" })),
        )
        .mount(&server)
        .await;

    let err = client.create("Ada", "ada@x.com").await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(err.status(), Some(409));
    match err {
        Error::Api { message, .. } => assert_eq!(message, "email already exists"),
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_error_without_message_falls_back_to_status_text() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    match client.create("Ada", "ada@x.com").await {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("400"), "got message: {message}");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ── Upsert tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_upsert_reports_created() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/users"))
        .and(query_param("id", "4"))
        .and(body_json(json!({ "name": "Ada", "email": "ada@x.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsert": "created" })))
        .mount(&server)
        .await;

    let outcome = client.upsert(4, "Ada", "ada@x.com").await.unwrap();

    assert_eq!(outcome, UpsertOutcome::Created);
}

#[tokio::test]
async fn test_upsert_reports_updated() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/users"))
        .and(query_param("id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsert": "updated" })))
        .mount(&server)
        .await;

    let outcome = client.upsert(4, "Ada B", "ada@y.com").await.unwrap();

    assert_eq!(outcome, UpsertOutcome::Updated);
}

#[tokio::test]
async fn test_upsert_rejection_surfaces_message() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "email already exists" })),
        )
        .mount(&server)
        .await;

    let err = client.upsert(4, "Ada", "taken@x.com").await.unwrap_err();

    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "email already exists");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

// ── Transport tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Port 1 is never listening.
    let client = UsersClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1").unwrap(),
    );

    let result = client.list("").await;

    match result {
        Err(e @ Error::Transport(_)) => assert!(e.is_transient()),
        other => panic!("expected Transport error, got: {other:?}"),
    }
}
