use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{chat, elevenlabs};
use crate::state::AppState;
use std::sync::Arc;

/// Create the widget-facing API router
///
/// These routes are consumed by the embedded voice widget and should be
/// layered with the embed-origin middleware by the caller.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/elevenlabs/check-config",
            get(elevenlabs::config_check::check_config),
        )
        .route("/api/elevenlabs/token", get(elevenlabs::token::issue_token))
        .route("/api/chat/send", post(chat::send_message))
        .layer(TraceLayer::new_for_http())
}
