//! Like/unlike endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use cookbook_common::db::Recipe;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::feed::FeedError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: Option<String>,
}

fn acting_user(request: LikeRequest) -> ApiResult<String> {
    request
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| FeedError::validation("userId", "userId is required").into())
}

/// POST /api/v1/recipes/:id/like
pub async fn like_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LikeRequest>,
) -> ApiResult<Json<Recipe>> {
    let user_id = acting_user(request)?;
    state
        .ledger
        .like(&id, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", id)))
}

/// POST /api/v1/recipes/:id/unlike
pub async fn unlike_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<LikeRequest>,
) -> ApiResult<Json<Recipe>> {
    let user_id = acting_user(request)?;
    state
        .ledger
        .unlike(&id, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", id)))
}
