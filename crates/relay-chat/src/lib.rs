//! Conversational core of the relay.
//!
//! Escalation scoring, per-session conversation history, grounded response
//! generation, and the dispatcher that decides between answering and opening
//! a support ticket for each inbound message.

pub mod collaborators;
pub mod completion;
pub mod context;
pub mod error;
pub mod escalation;
pub mod orchestrator;
pub mod response;

pub use collaborators::{
    MessageSender, MockMessageSender, MockTicketService, SentMessage, TicketService,
};
pub use completion::{CompletionParams, CompletionRequest, CompletionService, MockCompletion};
pub use context::ContextStore;
pub use error::ChatError;
pub use escalation::EscalationDetector;
pub use orchestrator::{
    build_knowledge_context, DispatchOutcome, DispatcherSettings, WebhookDispatcher,
};
pub use response::{ResponseGenerator, FALLBACK_REPLY};
