//! Widget state types

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum number of messages kept in history; oldest entries are evicted.
pub const MAX_HISTORY: usize = 100;

/// Who produced a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

impl Message {
    pub fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
            timestamp_ms: epoch_ms(),
        }
    }
}

/// Current phase of the voice call lifecycle
///
/// The happy path is linear (`Idle → AskingMic → GettingToken → Connecting →
/// Connected`); any state may fall to `Error` or return to `Idle` on
/// stop/disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceStatus {
    #[default]
    Idle,
    AskingMic,
    GettingToken,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for VoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VoiceStatus::Idle => "idle",
            VoiceStatus::AskingMic => "asking-mic",
            VoiceStatus::GettingToken => "getting-token",
            VoiceStatus::Connecting => "connecting",
            VoiceStatus::Connected => "connected",
            VoiceStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Complete widget state, owned exclusively by the session controller.
///
/// The UI only ever sees cloned snapshots pushed through listener callbacks.
#[derive(Debug, Clone, Default)]
pub struct WidgetState {
    pub is_open: bool,
    pub messages: Vec<Message>,
    pub voice_status: VoiceStatus,
    pub has_service_config: bool,
    pub is_muted: bool,
    pub is_typing: bool,
}

impl WidgetState {
    /// Append a message, keeping at most [`MAX_HISTORY`] entries.
    ///
    /// Empty text is ignored. Eviction drops the oldest entries first.
    pub fn push_message(&mut self, message: Message) -> bool {
        if message.text.is_empty() {
            return false;
        }
        self.messages.push(message);
        if self.messages.len() > MAX_HISTORY {
            let excess = self.messages.len() - MAX_HISTORY;
            self.messages.drain(..excess);
        }
        true
    }
}

/// Milliseconds since the Unix epoch
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_message_keeps_insertion_order() {
        let mut state = WidgetState::default();
        state.push_message(Message::new("uno", MessageKind::User));
        state.push_message(Message::new("dos", MessageKind::Assistant));

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].text, "uno");
        assert_eq!(state.messages[1].text, "dos");
    }

    #[test]
    fn test_push_message_evicts_oldest_beyond_window() {
        let mut state = WidgetState::default();
        for i in 0..(MAX_HISTORY + 25) {
            state.push_message(Message::new(format!("m{i}"), MessageKind::User));
        }

        assert_eq!(state.messages.len(), MAX_HISTORY);
        // The first 25 messages were evicted
        assert_eq!(state.messages[0].text, "m25");
        assert_eq!(state.messages.last().unwrap().text, format!("m{}", MAX_HISTORY + 24));
    }

    #[test]
    fn test_push_message_ignores_empty_text() {
        let mut state = WidgetState::default();
        assert!(!state.push_message(Message::new("", MessageKind::Assistant)));
        assert!(state.messages.is_empty());
    }

    #[test]
    fn test_voice_status_display() {
        assert_eq!(VoiceStatus::AskingMic.to_string(), "asking-mic");
        assert_eq!(VoiceStatus::GettingToken.to_string(), "getting-token");
        assert_eq!(VoiceStatus::Idle.to_string(), "idle");
    }
}
