//! HTTP request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `chat` - Text-chat fallback endpoint
//! - `elevenlabs` - Config check, conversation token minting, and webhook intake

pub mod api;
pub mod chat;
pub mod elevenlabs;
