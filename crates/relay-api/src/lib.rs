//! Relay API crate - axum HTTP server for webhook ingress and diagnostics.
//!
//! Receives conversation-platform webhooks, verifies their signature,
//! records them in the event log, and hands user messages to the
//! dispatcher. Also serves health, knowledge-base and log-inspection
//! endpoints.

pub mod error;
pub mod handlers;
pub mod payload;
pub mod routes;
pub mod signature;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
