//! Follow relationship endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use flux_common::AppResult;
use flux_core::{ProfileStats, RelationshipInfo, RelationshipResponse};

use super::ActionRequest;
use crate::{
    extractors::{AuthUser, ValidatedJson},
    middleware::AppState,
};

/// Flip the follow state.
async fn toggle_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<RelationshipResponse>> {
    let response = state
        .relationship_service
        .toggle_follow(&user.id, &user_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<RelationshipResponse>> {
    let response = state
        .relationship_service
        .follow(&user.id, &user_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ActionRequest>,
) -> AppResult<Json<RelationshipResponse>> {
    let response = state
        .relationship_service
        .unfollow(&user.id, &user_id, &req.request_id)
        .await?;
    Ok(Json(response))
}

async fn info(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<RelationshipInfo>> {
    let info = state
        .relationship_service
        .relationship_info(&user_id, &user.id)
        .await?;
    Ok(Json(info))
}

async fn stats(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ProfileStats>> {
    let stats = state
        .relationship_service
        .profile_stats(&user_id, &user.id)
        .await?;
    Ok(Json(stats))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/follow/{user_id}",
            post(toggle_follow).put(follow).delete(unfollow),
        )
        .route("/info/{user_id}", get(info))
        .route("/stats/{user_id}", get(stats))
}
