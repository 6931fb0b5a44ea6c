//! ElevenLabs webhook handler
//!
//! Receives conversation events pushed by the voice service, verifies the
//! HMAC-SHA256 payload signature when a shared secret is configured, and logs
//! the events with structured fields.

use axum::{extract::State, http::HeaderMap, response::Json};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::errors::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Signature header set by the voice service
const SIGNATURE_HEADER: &str = "elevenlabs-signature";

/// Webhook event envelope
///
/// The `data` payload varies per event kind and is kept opaque; this service
/// only inspects the few text fields it logs.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

/// Handler for POST /api/elevenlabs/webhook
///
/// Signature verification is opt-in: when no secret is configured the payload
/// is accepted as-is (the upstream sends unsigned events until signing is
/// enabled in its dashboard). When a secret is configured and the request
/// carries a signature header, a mismatch is rejected with 401. A missing
/// header with a configured secret is still accepted, matching the upstream's
/// rollout behavior.
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    if let Some(secret) = &state.config.webhook_secret
        && let Some(signature) = signature
        && !verify_signature(secret, &body, signature)
    {
        return Err(AppError::Unauthorized(
            "webhook signature mismatch".to_string(),
        ));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("malformed webhook body: {e}")))?;

    log_webhook_event(&event);

    Ok(Json(json!({ "received": true })))
}

/// Verify an HMAC-SHA256 hex signature computed over the raw request body.
///
/// The comparison happens inside `verify_slice`, which is constant-time.
/// A signature that is not valid hex fails verification.
pub fn verify_signature(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the hex signature for a payload. Used by tests and by operators
/// replaying events against a local server.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Log a webhook event with the text field relevant to its kind.
fn log_webhook_event(event: &WebhookEvent) {
    let text = event
        .data
        .get("transcription")
        .or_else(|| event.data.get("message"))
        .or_else(|| event.data.get("response"))
        .or_else(|| event.data.get("text"))
        .and_then(Value::as_str);

    match event.event_type.as_str() {
        "voice_deletion_warning" => {
            warn!(data = %event.data, "Voice deletion warning from upstream");
        }
        "transcription_completed" => {
            info!(transcription = ?text, "Transcription completed");
        }
        "conversation_message" => {
            info!(message = ?text, "Conversation message");
        }
        "agent_response" => {
            info!(response = ?text, "Agent response");
        }
        other => {
            debug!(event_type = %other, "Unknown webhook event type");
        }
    }
}
