//! HTTP API for cookbook-feed
//!
//! Everything except `/health` is nested under `/api/v1` by
//! [`build_router`](crate::build_router).

pub mod health;
pub mod likes;
pub mod recipes;
pub mod sse;
pub mod users;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub use health::health_routes;

/// Recipe CRUD routes
pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/:id",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
}

/// Like/unlike routes
pub fn like_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:id/like", post(likes::like_recipe))
        .route("/recipes/:id/unlike", post(likes::unlike_recipe))
}

/// Signup, login and user lookup
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/signup", post(users::signup))
        .route("/user/login", post(users::login))
        .route("/users/:id", get(users::get_user))
}

/// Live notification stream
pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", get(sse::event_stream))
}
