//! Microphone capability trait

use async_trait::async_trait;

use super::errors::MicrophoneError;

/// A live microphone capture, released when the call ends.
///
/// `release` must be idempotent; the controller calls it on every teardown
/// path, including failures partway through call setup.
pub trait MicrophoneHandle: Send + Sync {
    fn release(&self);
}

/// Capability trait for acquiring microphone access
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    /// Request capture permission and open the device.
    ///
    /// A denied permission prompt maps to [`MicrophoneError::PermissionDenied`].
    async fn acquire(&self) -> Result<Box<dyn MicrophoneHandle>, MicrophoneError>;
}
