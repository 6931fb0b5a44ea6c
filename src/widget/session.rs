//! Realtime voice session capability traits

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::RealtimeError;

/// Credentials for opening a realtime conversation
#[derive(Debug, Clone)]
pub struct ConversationToken {
    pub token: String,
    pub agent_id: Option<String>,
}

/// Who spoke in a realtime transcript event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSource {
    User,
    Assistant,
}

/// Event callbacks handed to the connector when opening a session.
///
/// All callbacks are synchronous and may fire from any task; the controller
/// installs generation-guarded closures so events from a torn-down session
/// cannot mutate fresh state.
#[derive(Clone)]
pub struct RealtimeEvents {
    pub on_connect: Arc<dyn Fn() + Send + Sync>,
    pub on_disconnect: Arc<dyn Fn() + Send + Sync>,
    pub on_message: Arc<dyn Fn(MessageSource, String) + Send + Sync>,
    pub on_error: Arc<dyn Fn(RealtimeError) + Send + Sync>,
}

/// Capability trait for opening realtime voice sessions
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(
        &self,
        token: ConversationToken,
        events: RealtimeEvents,
    ) -> Result<Box<dyn RealtimeSession>, RealtimeError>;
}

/// An open realtime voice session
#[async_trait]
pub trait RealtimeSession: Send + Sync {
    /// Send a user text message into the conversation
    async fn send_message(&self, text: &str) -> Result<(), RealtimeError>;

    /// Signal user activity so the agent pauses instead of talking over typing
    async fn notify_activity(&self) {}

    /// Mute or unmute the captured microphone audio
    async fn set_muted(&self, muted: bool);

    /// Close the session. Further events must not be delivered.
    async fn end(&self);

    /// Last-resort raw text injection over the underlying socket.
    ///
    /// Used only when [`send_message`](Self::send_message) fails; returns
    /// whether the write was attempted. The default has no raw socket access.
    async fn send_raw(&self, _text: &str) -> bool {
        false
    }
}
