//! Domain types shared across the relay crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Knowledge base
// =============================================================================

/// A knowledge-base article as fetched from the help center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Public URL of the article (`html_url` in the help center API).
    #[serde(default, alias = "html_url")]
    pub url: Option<String>,
}

/// One page of articles returned by an article source.
#[derive(Debug, Clone, Default)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    /// Absolute URL of the next page, if any.
    pub next_page: Option<String>,
}

/// A single article matched by a knowledge search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleHit {
    pub id: u64,
    pub title: String,
    /// Leading characters of the article body.
    pub body_excerpt: String,
    pub url: Option<String>,
    /// Cosine similarity with the query (0.0 to 1.0).
    pub similarity: f64,
}

// =============================================================================
// Conversations
// =============================================================================

/// Author of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a session's history. Never mutated after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle status of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
}

/// In-memory history of one external conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl ConversationSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            created_at: Utc::now(),
            status: SessionStatus::Active,
        }
    }
}

/// A role/content pair as sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Build the stable session key for an external app + conversation pair.
pub fn session_id(app_id: &str, conversation_id: &str) -> String {
    format!("{}_{}", app_id, conversation_id)
}

// =============================================================================
// Escalation
// =============================================================================

/// Result of scoring a message for human-handoff intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EscalationScore {
    /// An explicit human-request phrase was found.
    pub matched: bool,
    /// Fraction of escalation keywords present (0.0 to 1.0).
    pub score: f64,
}

// =============================================================================
// Inbound messages and tickets
// =============================================================================

/// Who wrote an inbound message, as reported by the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    User,
    Business,
    App,
    #[serde(other)]
    Unknown,
}

impl AuthorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorType::User => "user",
            AuthorType::Business => "business",
            AuthorType::App => "app",
            AuthorType::Unknown => "unknown",
        }
    }
}

/// A single inbound message after payload normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub app_id: String,
    pub conversation_id: String,
    pub user_id: Option<String>,
    pub message_id: Option<String>,
    pub author_type: AuthorType,
    pub text: String,
}

impl InboundMessage {
    pub fn session_id(&self) -> String {
        session_id(&self.app_id, &self.conversation_id)
    }

    /// True for end-user messages that carry non-blank text.
    pub fn is_actionable(&self) -> bool {
        self.author_type == AuthorType::User && !self.text.trim().is_empty()
    }
}

/// Request to open a support ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// A ticket created by the ticketing service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
