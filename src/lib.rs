pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod widget;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use errors::app_error::{AppError, AppResult};
pub use state::AppState;
pub use widget::{
    SessionController, VoiceStatus, WidgetBackend, WidgetConfig, WidgetError, WidgetResult,
};
