//! Conversation context management.
//!
//! Keeps the turn history of every session for the lifetime of the process
//! and renders it for the completion service and for support-agent handoff.
//! The session map is guarded by an `RwLock`; each session has its own
//! `Mutex` so appends to one session are serialized while different sessions
//! proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use tracing::info;

use relay_core::types::{ChatMessage, ConversationSession, Role, Turn};

/// Characters of each turn kept in a handoff summary.
const SUMMARY_TURN_CHARS: usize = 200;

type SessionHandle = Arc<Mutex<ConversationSession>>;

/// In-memory store of conversation sessions keyed by session id.
///
/// Sessions are never evicted.
#[derive(Debug, Default)]
pub struct ContextStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.get(session_id).cloned()
    }

    fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.get(session_id) {
            return handle;
        }
        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!(session_id, "Conversation started");
                Arc::new(Mutex::new(ConversationSession::new(session_id)))
            })
            .clone()
    }

    /// Append a turn, creating the session if it does not exist yet.
    pub fn append(&self, session_id: &str, role: Role, content: &str) {
        let handle = self.get_or_create(session_id);
        let mut session = match handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        session.turns.push(Turn {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// The last `limit` turns in chronological order, as role/content pairs.
    pub fn recent(&self, session_id: &str, limit: usize) -> Vec<ChatMessage> {
        let Some(handle) = self.get(session_id) else {
            return Vec::new();
        };
        let session = match handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let start = session.turns.len().saturating_sub(limit);
        session.turns[start..]
            .iter()
            .map(|t| ChatMessage::new(t.role.as_str(), t.content.clone()))
            .collect()
    }

    /// Human-readable history for a support agent. Empty if unknown.
    pub fn summary(&self, session_id: &str) -> String {
        let Some(session) = self.session(session_id) else {
            return String::new();
        };

        let mut lines = vec![
            format!("Conversa iniciada em: {}", session.created_at.to_rfc3339()),
            format!("Total de mensagens: {}", session.turns.len()),
            "\n--- Histórico ---\n".to_string(),
        ];
        for turn in &session.turns {
            let speaker = match turn.role {
                Role::User => "Cliente",
                Role::Assistant => "Assistente",
            };
            let content: String = turn.content.chars().take(SUMMARY_TURN_CHARS).collect();
            lines.push(format!("[{}] {}", speaker, content));
        }
        lines.join("\n")
    }

    /// Snapshot of a session, if it exists.
    pub fn session(&self, session_id: &str) -> Option<ConversationSession> {
        let handle = self.get(session_id)?;
        let session = match handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(session.clone())
    }

    /// Number of sessions held.
    pub fn len(&self) -> usize {
        match self.sessions.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
