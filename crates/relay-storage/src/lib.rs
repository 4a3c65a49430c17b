//! Relay Storage crate - SQLite event log for inbound webhooks.
//!
//! Records every webhook delivery verbatim together with its processing
//! outcome, and the conversations and messages extracted from it. Used for
//! auditing and the log-inspection endpoints; dispatch never depends on it.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{
    ConversationPage, ConversationRecord, ConversationRepository, LogPage, LogStats, MessageRecord,
    MessageRepository, NewMessage, NewWebhookLog, ProcessingStatus, WebhookLog,
    WebhookLogRepository,
};
