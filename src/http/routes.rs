use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Lifecycle control
        .route("/meeting/start", post(handlers::start_meeting))
        .route("/meeting/stop", post(handlers::stop_meeting))
        .route("/meeting/reset", post(handlers::reset_meeting))
        // Session queries
        .route("/meeting", get(handlers::get_meeting))
        .route("/meeting/transcript", get(handlers::get_transcript))
        .route("/meeting/minutes", get(handlers::get_minutes))
        // The recording UI is served elsewhere
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
