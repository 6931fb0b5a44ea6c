//! Error types for the widget session controller

/// Errors from the backend token/chat service
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Invalid response: {0}")]
    Invalid(String),
}

/// Errors from microphone acquisition
#[derive(Debug, Clone, thiserror::Error)]
pub enum MicrophoneError {
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("Microphone unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the realtime voice session
#[derive(Debug, Clone, thiserror::Error)]
pub enum RealtimeError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

impl RealtimeError {
    /// Whether this error looks like a recoverable low-level transport blip.
    ///
    /// The realtime SDK retries its own socket internally; errors carrying a
    /// websocket signature are surfaced as informational only, everything else
    /// forces a teardown.
    pub fn is_transient(&self) -> bool {
        let message = match self {
            RealtimeError::ConnectionFailed(m)
            | RealtimeError::Transport(m)
            | RealtimeError::SendFailed(m) => m,
        };
        message.to_lowercase().contains("websocket")
    }
}

/// Top-level widget error
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Microphone error: {0}")]
    Microphone(#[from] MicrophoneError),
    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),
    #[error("Service not configured")]
    NotConfigured,
}

/// Result type for widget operations
pub type WidgetResult<T> = Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification_matches_websocket_signature() {
        assert!(RealtimeError::Transport("WebSocket closed unexpectedly".to_string()).is_transient());
        assert!(RealtimeError::Transport("websocket ping timeout".to_string()).is_transient());
        assert!(!RealtimeError::Transport("ICE negotiation failed".to_string()).is_transient());
        assert!(!RealtimeError::ConnectionFailed("401 unauthorized".to_string()).is_transient());
    }
}
