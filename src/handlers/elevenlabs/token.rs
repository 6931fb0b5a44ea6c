//! Conversation token minting handler
//!
//! The widget calls this endpoint right before opening a realtime session.
//! The handler proxies to the ElevenLabs conversation-token endpoint using the
//! server-side API key, so the key never reaches the browser.
//!
//! "Not configured" and "token minting failed" are not hard failures: both are
//! reported inside a 200 body so the widget can tell the feature being off
//! from a transient error and degrade to its simulated fallback.

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::state::AppState;

/// Upstream request timeout. The widget gives up at 10s, so stay under that.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(8);

/// Response body for GET /api/elevenlabs/token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub configured: bool,
    pub token_generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
}

impl TokenResponse {
    fn unconfigured() -> Self {
        Self {
            configured: false,
            token_generated: false,
            token: None,
            agent_id: None,
            fallback_mode: None,
            error: Some(
                "El servicio de voz no está configurado. El asistente estará disponible \
                 una vez completada la configuración."
                    .to_string(),
            ),
            client_ip: None,
        }
    }

    fn fallback(agent_id: &str, error: String) -> Self {
        Self {
            configured: true,
            token_generated: false,
            token: None,
            agent_id: Some(agent_id.to_string()),
            fallback_mode: Some(true),
            error: Some(error),
            client_ip: None,
        }
    }
}

/// Body returned by the upstream token endpoint
#[derive(Debug, Deserialize)]
struct UpstreamToken {
    token: String,
}

/// Handler for GET /api/elevenlabs/token
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<TokenResponse> {
    let client_ip = extract_client_ip(&headers);

    let (api_key, agent_id) = match (
        &state.config.elevenlabs_api_key,
        &state.config.elevenlabs_agent_id,
    ) {
        (Some(key), Some(agent)) => (key.clone(), agent.clone()),
        _ => {
            info!(client_ip = ?client_ip, "Token requested but voice service is not configured");
            return Json(TokenResponse::unconfigured());
        }
    };

    let url = format!(
        "{}/v1/convai/conversation/token?agent_id={}",
        state.config.elevenlabs_api_base, agent_id
    );

    let response = match state
        .http
        .get(&url)
        .header("xi-api-key", api_key)
        .header("Content-Type", "application/json")
        .timeout(UPSTREAM_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            error!(error = %e, "Conversation token request failed");
            return Json(TokenResponse::fallback(
                &agent_id,
                format!("Token generation error: {e}"),
            ));
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Upstream rejected token request");
        return Json(TokenResponse::fallback(
            &agent_id,
            format!("Token generation failed ({status}): {body}"),
        ));
    }

    let upstream: UpstreamToken = match response.json().await {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "Malformed upstream token response");
            return Json(TokenResponse::fallback(
                &agent_id,
                format!("Malformed token response: {e}"),
            ));
        }
    };

    info!(agent_id = %agent_id, client_ip = ?client_ip, "Issued conversation token");

    Json(TokenResponse {
        configured: true,
        token_generated: true,
        token: Some(upstream.token),
        agent_id: Some(agent_id),
        fallback_mode: None,
        error: None,
        client_ip,
    })
}

/// Extract the caller's IP from proxy headers
///
/// Checks `x-forwarded-for` (first hop) then `x-real-ip`. Returns None when
/// neither is present; the widget only uses this for diagnostics.
fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for")
        && let Ok(value) = forwarded.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_client_ip_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));

        assert_eq!(extract_client_ip(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_extract_client_ip_real_ip_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        assert_eq!(
            extract_client_ip(&headers),
            Some("198.51.100.4".to_string())
        );
    }

    #[test]
    fn test_extract_client_ip_absent() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers), None);
    }

    #[test]
    fn test_token_response_skips_empty_fields() {
        let response = TokenResponse::unconfigured();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["configured"], false);
        assert_eq!(json["tokenGenerated"], false);
        assert!(json.get("token").is_none());
        assert!(json.get("agentId").is_none());
        assert!(json["error"].as_str().unwrap().contains("no está configurado"));
    }

    #[test]
    fn test_token_response_fallback_shape() {
        let response = TokenResponse::fallback("agent_1", "upstream said no".to_string());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["configured"], true);
        assert_eq!(json["tokenGenerated"], false);
        assert_eq!(json["fallbackMode"], true);
        assert_eq!(json["agentId"], "agent_1");
        assert_eq!(json["error"], "upstream said no");
    }
}
