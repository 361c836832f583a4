//! API integration tests.
//!
//! These drive the full router, including the auth middleware, over a mock
//! database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    middleware,
};
use chrono::Utc;
use flux_api::{AppState, auth_middleware, router as api_router};
use flux_db::entities::{
    interaction::{self, InteractionKind},
    post, user,
};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
use serde_json::Value as Json;
use tower::ServiceExt;

const TOKEN: &str = "token-1";

fn test_user(id: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: format!("user{id}"),
        token: Some(format!("token-{id}")),
        created_at: Utc::now().into(),
    }
}

fn test_post(like_count: i32) -> post::Model {
    post::Model {
        id: "42".to_string(),
        user_id: "9".to_string(),
        text: Some("hello".to_string()),
        like_count,
        share_count: 0,
        is_deleted: false,
        created_at: Utc::now().into(),
    }
}

fn like_record(request_id: &str) -> interaction::Model {
    interaction::Model {
        id: "i1".to_string(),
        user_id: "1".to_string(),
        post_id: "42".to_string(),
        kind: InteractionKind::Like,
        active: true,
        request_id: request_id.to_string(),
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    maplit::btreemap! {
        "num_items" => Value::BigInt(Some(n))
    }
}

/// Create the router the server mounts, over the given mock database.
fn create_test_router(db: MockDatabase) -> Router {
    let state = AppState::new(Arc::new(db.into_connection()));
    Router::new()
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn authed(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("Authorization", format!("Bearer {TOKEN}"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Json {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_like_without_token_is_unauthorized() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/interaction/post/42/like")
                .method("POST")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"requestId":"r1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_like_returns_interaction_response() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("1")]])
        .append_query_results([[test_post(0)]])
        .append_query_results([Vec::<interaction::Model>::new()])
        .append_query_results([Vec::<interaction::Model>::new()])
        .append_query_results([[like_record("r1")]])
        .append_query_results([[test_post(1)]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed(
            "POST",
            "/api/v1/interaction/post/42/like",
            r#"{"requestId":"r1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["postId"], "42");
    assert_eq!(body["actionType"], "LIKED");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Post liked successfully");
    assert_eq!(body["currentCount"], 1);
    assert!(body.get("outcome").is_none());
}

#[tokio::test]
async fn test_empty_request_id_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[test_user("1")]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed(
            "DELETE",
            "/api/v1/interaction/post/42/bookmark",
            r#"{"requestId":""}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_body_is_bad_request() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[test_user("1")]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed("POST", "/api/v1/interaction/post/42/share", "not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_like_on_missing_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("1")]])
        .append_query_results([Vec::<post::Model>::new()]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed(
            "POST",
            "/api/v1/interaction/post/404/like",
            r#"{"requestId":"r1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_liked_status() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("1")]])
        .append_query_results([[count_row(1)]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed("GET", "/api/v1/interaction/post/42/liked", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["liked"], true);
}

#[tokio::test]
async fn test_self_follow_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[test_user("1")]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed(
            "POST",
            "/api/v1/relationship/follow/1",
            r#"{"requestId":"r1"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_profile_stats() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[test_user("1")]])
        .append_query_results([[count_row(12)]])
        .append_query_results([[count_row(40)]])
        .append_query_results([[count_row(8)]])
        .append_query_results([[count_row(0)]]);
    let app = create_test_router(db);

    let response = app
        .oneshot(authed("GET", "/api/v1/relationship/stats/2", ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["postCount"], 12);
    assert_eq!(body["followersCount"], 40);
    assert_eq!(body["followingCount"], 8);
    assert_eq!(body["isFollowing"], false);
}
