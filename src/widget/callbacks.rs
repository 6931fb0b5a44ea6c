//! UI listener types for the session controller
//!
//! The UI renderer is a pure projection of controller state: it registers one
//! listener per event kind and re-renders from the snapshots it receives.
//! Each listener is replaceable; registering a new one drops the previous.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use super::state::{Message, VoiceStatus};

/// Called when the call status changes
pub type StatusCallback = Arc<dyn Fn(VoiceStatus) + Send + Sync>;

/// Called when the message history or the typing flag changes.
/// Receives a snapshot of the history and the current typing flag.
pub type MessagesCallback = Arc<dyn Fn(&[Message], bool) + Send + Sync>;

/// Called when the mute flag changes
pub type MuteCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Called when the panel is opened or closed
pub type ToggleCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Called to surface a toast notification: title, message, display duration
pub type ToastCallback = Arc<dyn Fn(&str, &str, Duration) + Send + Sync>;

/// Listener registry, at most one listener per event kind.
#[derive(Default)]
pub struct WidgetListeners {
    on_status_change: RwLock<Option<StatusCallback>>,
    on_messages_change: RwLock<Option<MessagesCallback>>,
    on_mute_change: RwLock<Option<MuteCallback>>,
    on_toggle: RwLock<Option<ToggleCallback>>,
    on_toast: RwLock<Option<ToastCallback>>,
}

impl WidgetListeners {
    pub fn set_on_status_change(&self, callback: StatusCallback) {
        *self.on_status_change.write() = Some(callback);
    }

    pub fn set_on_messages_change(&self, callback: MessagesCallback) {
        *self.on_messages_change.write() = Some(callback);
    }

    pub fn set_on_mute_change(&self, callback: MuteCallback) {
        *self.on_mute_change.write() = Some(callback);
    }

    pub fn set_on_toggle(&self, callback: ToggleCallback) {
        *self.on_toggle.write() = Some(callback);
    }

    pub fn set_on_toast(&self, callback: ToastCallback) {
        *self.on_toast.write() = Some(callback);
    }

    pub(crate) fn notify_status(&self, status: VoiceStatus) {
        if let Some(callback) = self.on_status_change.read().clone() {
            callback(status);
        }
    }

    pub(crate) fn notify_messages(&self, messages: &[Message], is_typing: bool) {
        if let Some(callback) = self.on_messages_change.read().clone() {
            callback(messages, is_typing);
        }
    }

    pub(crate) fn notify_mute(&self, is_muted: bool) {
        if let Some(callback) = self.on_mute_change.read().clone() {
            callback(is_muted);
        }
    }

    pub(crate) fn notify_toggle(&self, is_open: bool) {
        if let Some(callback) = self.on_toggle.read().clone() {
            callback(is_open);
        }
    }

    pub(crate) fn notify_toast(&self, title: &str, message: &str, duration: Duration) {
        if let Some(callback) = self.on_toast.read().clone() {
            callback(title, message, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listener_is_replaceable() {
        let listeners = WidgetListeners::default();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        listeners.set_on_mute_change(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.notify_mute(true);

        let counter = second.clone();
        listeners.set_on_mute_change(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.notify_mute(false);

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_notify_without_listener_is_noop() {
        let listeners = WidgetListeners::default();
        listeners.notify_status(VoiceStatus::Connected);
        listeners.notify_messages(&[], false);
        listeners.notify_toast("t", "m", Duration::from_secs(5));
    }
}
