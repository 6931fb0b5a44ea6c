//! # Widget session controller
//!
//! Core of the embeddable voice widget: owns the widget state (open flag,
//! message history, call status, mute and typing flags) and the call
//! lifecycle, and mediates between the microphone, the third-party realtime
//! voice SDK, and the backend text-chat fallback.
//!
//! The controller talks to the outside world only through capability traits
//! ([`WidgetBackend`], [`MicrophoneSource`], [`RealtimeConnector`]) and pushes
//! read-only snapshots to the UI through replaceable listeners
//! ([`WidgetListeners`]). The UI holds no state of its own.

pub mod backend;
pub mod callbacks;
pub mod controller;
pub mod errors;
pub mod microphone;
pub mod session;
pub mod state;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use backend::{
    ChatReply, ConfigStatus, HttpWidgetBackend, OutboundChat, TokenGrant, WidgetBackend,
};
pub use callbacks::{
    MessagesCallback, MuteCallback, StatusCallback, ToastCallback, ToggleCallback, WidgetListeners,
};
pub use controller::{SessionController, WidgetConfig};
pub use errors::{BackendError, MicrophoneError, RealtimeError, WidgetError, WidgetResult};
pub use microphone::{MicrophoneHandle, MicrophoneSource};
pub use session::{ConversationToken, MessageSource, RealtimeConnector, RealtimeEvents, RealtimeSession};
pub use state::{Message, MessageKind, VoiceStatus, WidgetState};
