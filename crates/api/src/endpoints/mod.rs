//! API endpoints.

mod interaction;
mod relationship;

use axum::Router;
use serde::Deserialize;
use validator::Validate;

use crate::middleware::AppState;

/// Body shared by every mutating endpoint.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[validate(length(min = 1, max = 128))]
    pub request_id: String,
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/interaction", interaction::router())
        .nest("/relationship", relationship::router())
}
