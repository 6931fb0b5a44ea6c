use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Response body for GET /api/elevenlabs/check-config
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheckResponse {
    pub configured: bool,
    pub details: ConfigCheckDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheckDetails {
    pub has_api_key: bool,
    pub has_agent_id: bool,
    pub missing: Vec<&'static str>,
}

/// Handler for GET /api/elevenlabs/check-config
///
/// Reports whether the voice service can be used. Never fails: the widget
/// treats any non-2xx or malformed reply as "not configured", so this endpoint
/// always answers with a descriptive 200.
pub async fn check_config(State(state): State<Arc<AppState>>) -> Json<ConfigCheckResponse> {
    let has_api_key = state.config.elevenlabs_api_key.is_some();
    let has_agent_id = state.config.elevenlabs_agent_id.is_some();

    Json(ConfigCheckResponse {
        configured: has_api_key && has_agent_id,
        details: ConfigCheckDetails {
            has_api_key,
            has_agent_id,
            missing: state.config.missing_voice_config(),
        },
    })
}
