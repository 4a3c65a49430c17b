//! Error types for the dispatcher boundary.

/// Errors surfaced by [`crate::WebhookDispatcher`].
///
/// Collaborator failures that have a defined fallback (generation, ticket
/// creation, retrieval) never reach this type; only failures the caller must
/// report do.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to deliver reply: {reason}")]
    Delivery {
        /// The reply that could not be sent.
        reply: String,
        reason: String,
    },
}
