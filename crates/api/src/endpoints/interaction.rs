//! Post interaction endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use flux_common::AppResult;
use flux_core::InteractionResponse;
use serde_json::{Value, json};

use super::ActionRequest;
use crate::{
    extractors::{AuthUser, ValidatedJson},
    middleware::AppState,
};

async fn like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<InteractionResponse>> {
    let response = state
        .interaction_service
        .like(&user.id, &post_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn unlike(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<InteractionResponse>> {
    let response = state
        .interaction_service
        .unlike(&user.id, &post_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn bookmark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<InteractionResponse>> {
    let response = state
        .interaction_service
        .bookmark(&user.id, &post_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn unbookmark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<InteractionResponse>> {
    let response = state
        .interaction_service
        .unbookmark(&user.id, &post_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn share(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<InteractionResponse>> {
    let response = state
        .interaction_service
        .share(&user.id, &post_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

/// Whether the current user likes a post.
async fn liked(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Value>> {
    let liked = state.interaction_service.is_liked(&user.id, &post_id).await?;
    Ok(Json(json!({ "liked": liked })))
}

/// Whether the current user has bookmarked a post.
async fn bookmarked(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Value>> {
    let bookmarked = state
        .interaction_service
        .is_bookmarked(&user.id, &post_id)
        .await?;
    Ok(Json(json!({ "bookmarked": bookmarked })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{post_id}/like", post(like).delete(unlike))
        .route("/post/{post_id}/bookmark", post(bookmark).delete(unbookmark))
        .route("/post/{post_id}/share", post(share))
        .route("/post/{post_id}/liked", get(liked))
        .route("/post/{post_id}/bookmarked", get(bookmarked))
}
