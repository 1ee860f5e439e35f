pub mod health;
pub mod notifications;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(notifications::router())
        .with_state(state)
}

/// The router wrapped in the HTTP middleware stack the server runs with.
///
/// The body limit sits outside CORS: `CorsLayer` needs an inner response
/// body that implements `Default`, which the limit's body does not.
pub fn create_app(state: AppState) -> Router {
    create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(CorsLayer::permissive()),
    )
}
