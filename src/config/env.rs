use std::env;

use super::ServerConfig;

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables with sensible defaults.
    /// Also loads from a `.env` file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if `PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        // Server configuration
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid port number: {e}"))?;

        // ElevenLabs configuration
        let elevenlabs_api_key = env::var("ELEVENLABS_API_KEY").ok();
        let elevenlabs_agent_id = env::var("ELEVENLABS_AGENT_ID").ok();
        let elevenlabs_api_base = env::var("ELEVENLABS_API_BASE")
            .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string());

        // Webhook signature secret (verification disabled when unset)
        let webhook_secret = env::var("ELEVENLABS_WEBHOOK_SECRET").ok();

        // Embed-origin allow list, comma separated; empty means allow all
        let allowed_embed_domains = env::var("ALLOWED_EMBED_DOMAINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ServerConfig {
            host,
            port,
            elevenlabs_api_key,
            elevenlabs_agent_id,
            elevenlabs_api_base,
            webhook_secret,
            allowed_embed_domains,
        })
    }
}
