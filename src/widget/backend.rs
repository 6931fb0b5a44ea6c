//! Backend capability trait and HTTP implementation
//!
//! The controller never talks HTTP directly; it goes through [`WidgetBackend`]
//! so tests can substitute a mock and the widget can be hosted against any
//! server exposing the same three endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::controller::WidgetConfig;
use super::errors::BackendError;

/// Response of the config-check endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigStatus {
    #[serde(default)]
    pub configured: bool,
}

/// Response of the conversation-token endpoint.
///
/// The endpoint always answers 200; failure modes are expressed in the body
/// (`configured: false` or `tokenGenerated: false`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    #[serde(default)]
    pub configured: bool,
    #[serde(default)]
    pub token_generated: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Request body for the chat fallback endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundChat {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub source: String,
}

/// Response of the chat fallback endpoint.
///
/// Some deployments answer with `message` instead of `response`; accept both.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    #[serde(alias = "message")]
    pub response: String,
}

/// Capability trait for the widget's backend service
#[async_trait]
pub trait WidgetBackend: Send + Sync {
    /// Ask the backend whether the voice service is configured
    async fn check_config(&self) -> Result<ConfigStatus, BackendError>;

    /// Request a single-use conversation token
    async fn fetch_token(&self) -> Result<TokenGrant, BackendError>;

    /// Send a text message through the chat fallback
    async fn send_chat(&self, chat: &OutboundChat) -> Result<ChatReply, BackendError>;
}

/// [`WidgetBackend`] backed by reqwest against the widget's own API
pub struct HttpWidgetBackend {
    client: reqwest::Client,
    api_base_url: String,
    chat_endpoint: String,
    config_check_timeout: Duration,
    token_timeout: Duration,
    chat_timeout: Duration,
}

impl HttpWidgetBackend {
    pub fn new(config: &WidgetConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url: config.api_base_url.clone(),
            chat_endpoint: config.chat_endpoint.clone(),
            config_check_timeout: config.config_check_timeout,
            token_timeout: config.token_timeout,
            chat_timeout: config.chat_timeout,
        }
    }

    fn map_error(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Network(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl WidgetBackend for HttpWidgetBackend {
    async fn check_config(&self) -> Result<ConfigStatus, BackendError> {
        let url = format!("{}/api/elevenlabs/check-config", self.api_base_url);
        debug!(url = %url, "Checking voice service configuration");

        let response = self
            .client
            .get(&url)
            .timeout(self.config_check_timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        let response = Self::check_status(response).await?;

        response
            .json::<ConfigStatus>()
            .await
            .map_err(|e| BackendError::Invalid(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<TokenGrant, BackendError> {
        let url = format!("{}/api/elevenlabs/token", self.api_base_url);
        debug!(url = %url, "Requesting conversation token");

        let response = self
            .client
            .get(&url)
            .timeout(self.token_timeout)
            .send()
            .await
            .map_err(Self::map_error)?;
        let response = Self::check_status(response).await?;

        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| BackendError::Invalid(e.to_string()))
    }

    async fn send_chat(&self, chat: &OutboundChat) -> Result<ChatReply, BackendError> {
        debug!(url = %self.chat_endpoint, "Sending chat fallback message");

        let response = self
            .client
            .post(&self.chat_endpoint)
            .timeout(self.chat_timeout)
            .json(chat)
            .send()
            .await
            .map_err(Self::map_error)?;
        let response = Self::check_status(response).await?;

        response
            .json::<ChatReply>()
            .await
            .map_err(|e| BackendError::Invalid(e.to_string()))
    }
}
