use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// Health check handler
///
/// Reports liveness plus whether the voice service credentials are present,
/// so deploy checks can catch a half-configured environment.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "ok",
        "elevenlabsConfigured": state.config.is_voice_configured(),
    })))
}
