//! ElevenLabs integration handlers
//!
//! - `config_check` - reports whether the voice service is configured
//! - `token` - mints short-lived conversation tokens against the upstream API
//! - `webhook` - receives signed conversation events

pub mod config_check;
pub mod token;
pub mod webhook;
