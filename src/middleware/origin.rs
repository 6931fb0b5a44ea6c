use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Embed-origin validation middleware
///
/// Widget-facing routes may only be called from pages on the configured embed
/// domains. The check uses the `origin` header with `referer` as fallback and
/// matches against `ALLOWED_EMBED_DOMAINS`. Requests without either header
/// (curl, server-to-server, same-origin fetches in some browsers) pass
/// through, as do all requests when no allow list is configured.
pub async fn validate_origin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get("origin")
        .or_else(|| request.headers().get("referer"))
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if state.config.is_origin_allowed(origin) {
        return next.run(request).await;
    }

    tracing::warn!(origin = %origin, "Rejected request from unauthorized embed origin");

    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Acceso denegado desde este dominio",
            "configured": false,
        })),
    )
        .into_response()
}
