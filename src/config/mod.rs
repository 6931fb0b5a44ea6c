//! Configuration module for the campus-voice server
//!
//! Configuration comes from environment variables (with `.env` support via
//! dotenvy). Voice-service credentials are optional: the server runs without
//! them and simply reports the feature as unconfigured, so the widget can
//! degrade to its text fallback instead of failing.

mod env;

/// Server configuration
///
/// Contains everything needed to run the campus-voice server:
/// - Server settings (host, port)
/// - ElevenLabs conversational-voice settings (API key, agent, upstream base URL)
/// - Webhook signature secret
/// - Embed-origin allow list
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // ElevenLabs settings
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_agent_id: Option<String>,
    pub elevenlabs_api_base: String,

    // Webhook signature verification (opt-in: verification only runs when set)
    pub webhook_secret: Option<String>,

    // Domains allowed to embed the widget; empty list allows all origins
    pub allowed_embed_domains: Vec<String>,
}

impl ServerConfig {
    /// Get the server address as a string in "host:port" form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if the voice service is fully configured
    ///
    /// Returns true only when both the API key and the agent id are present.
    pub fn is_voice_configured(&self) -> bool {
        self.elevenlabs_api_key.is_some() && self.elevenlabs_agent_id.is_some()
    }

    /// List the names of missing voice-service environment variables
    pub fn missing_voice_config(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.elevenlabs_api_key.is_none() {
            missing.push("ELEVENLABS_API_KEY");
        }
        if self.elevenlabs_agent_id.is_none() {
            missing.push("ELEVENLABS_AGENT_ID");
        }
        missing
    }

    /// Check whether an embed origin is allowed
    ///
    /// The match is a host-suffix match against the allow list, so
    /// `https://www.uic.mx/page` matches an allowed domain `uic.mx`.
    /// An empty allow list accepts every origin; an empty origin (non-browser
    /// client, same-origin request) is always accepted.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_embed_domains.is_empty() || origin.is_empty() {
            return true;
        }
        self.allowed_embed_domains
            .iter()
            .any(|domain| origin.contains(domain.as_str()))
    }
}
