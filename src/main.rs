use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use anyhow::anyhow;

use campus_voice::{ServerConfig, middleware::origin::validate_origin, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();
    println!("Starting server on {address}");
    println!("Voice service configured: {}", config.is_voice_configured());

    // Create application state
    let app_state = AppState::new(config);

    // Widget-facing API routes are gated by the embed-origin allow list.
    // CORS stays permissive at the HTTP layer; the allow list is enforced by
    // the origin middleware so rejected embedders get a descriptive body.
    let api_routes = routes::api::create_api_router()
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            validate_origin,
        ))
        .layer(CorsLayer::permissive());

    // Webhook routes authenticate via signed payloads, not origins
    let webhook_routes = routes::webhooks::create_webhook_router();

    // Public health check route
    let public_routes = Router::new().route(
        "/health",
        axum::routing::get(campus_voice::handlers::api::health_check),
    );

    let app = public_routes
        .merge(api_routes)
        .merge(webhook_routes)
        .with_state(app_state);

    let listener = TcpListener::bind(&address).await?;

    println!("Server listening on {address}");

    axum::serve(listener, app).await?;

    Ok(())
}
