use axum::{Router, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::elevenlabs;
use crate::state::AppState;

/// Create the webhook router for unauthenticated webhook endpoints
///
/// These routes are called by the voice service itself and authenticate via
/// signed payloads, so they must be merged without the origin middleware.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/elevenlabs/webhook",
            post(elevenlabs::webhook::handle_webhook),
        )
        .layer(TraceLayer::new_for_http())
}
