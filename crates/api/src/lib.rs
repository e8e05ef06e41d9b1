//! HTTP surface of the sqlab grading service.

pub mod error;
pub mod handlers;
pub mod state;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Assemble the full application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::health::create_router())
        .merge(handlers::attempts::create_router())
        .merge(handlers::execute::create_router())
        .merge(handlers::expected::create_router())
        .merge(handlers::grade::create_router())
        .merge(handlers::provision::create_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
