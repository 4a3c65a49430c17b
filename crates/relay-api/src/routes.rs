//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with tracing, the global body limit,
//! and all endpoint handlers.

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use relay_core::config::RelayConfig;
use relay_core::error::RelayError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let webhook_routes = Router::new()
        .route("/webhook/sunshine", post(handlers::webhook))
        .route("/webhook/zendesk", post(handlers::webhook));

    let diagnostic_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/test", get(handlers::test_status))
        .route(
            "/debug/conversation/{session_id}",
            get(handlers::debug_conversation),
        )
        .route("/knowledge/reload", post(handlers::reload_knowledge));

    let log_routes = Router::new()
        .route("/api/webhook-logs", get(handlers::list_webhook_logs))
        .route("/api/webhook-logs/stats", get(handlers::webhook_log_stats))
        .route("/api/webhook-logs/{id}", get(handlers::get_webhook_log))
        .route("/api/conversations", get(handlers::list_conversations))
        .route(
            "/api/conversations/{external_id}/messages",
            get(handlers::conversation_messages),
        );

    webhook_routes
        .merge(diagnostic_routes)
        .merge(log_routes)
        .layer(DefaultBodyLimit::max(handlers::MAX_BODY_BYTES)) // 1MB global limit
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the configured host and port.
pub async fn start_server(config: &RelayConfig, state: AppState) -> Result<(), RelayError> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let router = create_router(state);

    tracing::info!("Starting relay server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Http(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| RelayError::Http(format!("Server error: {}", e)))?;

    Ok(())
}
