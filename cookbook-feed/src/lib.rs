//! cookbook-feed library - Recipe feed service
//!
//! Lists, likes and publishes shared recipes over HTTP and streams new
//! recipes to connected clients.

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod error;
pub mod feed;
pub mod store;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;

use feed::{ConnectionRegistry, LifecycleManager, LikeLedger, Notifier, QueryEngine};
use store::RecipeStore;
use users::UserDirectory;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub query: QueryEngine,
    pub ledger: LikeLedger,
    pub lifecycle: LifecycleManager,
    pub users: UserDirectory,
    /// Live SSE sessions
    pub registry: ConnectionRegistry,
    pub notifier: Notifier,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Wire every component to one store and one registry
    pub fn new(store: Arc<dyn RecipeStore>, registry: ConnectionRegistry) -> Self {
        Self {
            query: QueryEngine::new(Arc::clone(&store)),
            ledger: LikeLedger::new(Arc::clone(&store)),
            lifecycle: LifecycleManager::new(Arc::clone(&store)),
            users: UserDirectory::new(store),
            notifier: Notifier::new(registry.clone()),
            registry,
            cors_origins: Vec::new(),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build application router
///
/// `/health` stays at the root; everything else lives under `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(api::recipe_routes())
        .merge(api::like_routes())
        .merge(api::user_routes())
        .merge(api::event_routes());

    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .nest("/api/v1", v1)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
