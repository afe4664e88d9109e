use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Dictation control
        .route("/dictation/start", post(handlers::start_dictation))
        .route("/dictation/:note_id/stop", post(handlers::stop_dictation))
        .route(
            "/dictation/:note_id/cancel",
            post(handlers::cancel_dictation),
        )
        // Session queries
        .route("/dictation/:note_id/status", get(handlers::get_status))
        .route(
            "/dictation/:note_id/transcript",
            get(handlers::get_transcript),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
