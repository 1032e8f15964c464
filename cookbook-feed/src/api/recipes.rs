//! Recipe endpoints
//!
//! Mutations act on behalf of the identity supplied in the request
//! (`authorId`). Reads are open to everyone.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cookbook_common::db::Recipe;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::feed::{Owned, QuerySpec, RecipeDraft, RecipeUpdate};
use crate::AppState;

/// Query parameters for GET /recipes
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub author: Option<String>,
    pub tag: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Body of POST /recipes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    pub author_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Option<String>>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of PATCH /recipes/:id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipeRequest {
    pub author_id: Option<String>,
    pub title: Option<String>,
    pub ingredients: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Acting identity for DELETE, from the query string or the body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActingAuthor {
    pub author_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted_count: u64,
}

fn require_author(author_id: Option<String>) -> ApiResult<String> {
    author_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("authorId is required".to_string()))
}

/// GET /api/v1/recipes
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Recipe>>> {
    let spec = QuerySpec::from_params(
        params.author,
        params.tag,
        params.sort_by.as_deref(),
        params.sort_order.as_deref(),
    )?;
    debug!("Listing recipes: {:?}", spec);

    let recipes = state.query.list(&spec).await?;
    Ok(Json(recipes))
}

/// GET /api/v1/recipes/:id
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Recipe>> {
    state
        .query
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", id)))
}

/// POST /api/v1/recipes
///
/// Announces the new recipe to connected sessions after it is stored.
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(request): Json<CreateRecipeRequest>,
) -> ApiResult<(StatusCode, Json<Recipe>)> {
    let draft = RecipeDraft {
        title: request.title,
        ingredients: request.ingredients,
        instructions: request.instructions,
        image_url: request.image_url,
        tags: request.tags,
    };
    let author_id = request.author_id.unwrap_or_default();

    let recipe = state.lifecycle.create(&author_id, draft).await?;
    state.notifier.on_recipe_created(&recipe);

    Ok((StatusCode::CREATED, Json(recipe)))
}

/// PATCH /api/v1/recipes/:id
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateRecipeRequest>,
) -> ApiResult<Json<Recipe>> {
    let author_id = require_author(request.author_id)?;
    let update = RecipeUpdate {
        title: request.title,
        ingredients: request.ingredients,
        instructions: request.instructions,
        image_url: request.image_url,
        tags: request.tags,
    };

    match state.lifecycle.update(&author_id, &id, update).await? {
        Owned::Found(recipe) => Ok(Json(recipe)),
        Owned::NotFoundOrForbidden => Err(ApiError::NotFound(format!("recipe {}", id))),
    }
}

/// DELETE /api/v1/recipes/:id
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActingAuthor>,
    body: Option<Json<ActingAuthor>>,
) -> ApiResult<Response> {
    let author_id = require_author(
        query
            .author_id
            .or_else(|| body.and_then(|Json(body)| body.author_id)),
    )?;

    let deleted_count = state.lifecycle.delete(&author_id, &id).await?;
    let status = if deleted_count == 0 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DeleteResponse { deleted_count })).into_response())
}
