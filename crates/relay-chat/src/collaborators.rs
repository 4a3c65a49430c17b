//! Outbound collaborators of the dispatcher: ticketing and message delivery.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use relay_core::error::RelayError;
use relay_core::types::{NewTicket, Ticket};

/// Opens human-support tickets.
#[async_trait]
pub trait TicketService: Send + Sync {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, RelayError>;
}

/// Sends a text reply into an external conversation.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, app_id: &str, conversation_id: &str, text: &str)
        -> Result<(), RelayError>;
}

// =============================================================================
// Mock implementations
// =============================================================================

/// In-memory ticketing service for testing.
///
/// Assigns sequential ids starting at 1000 and records every request.
#[derive(Debug, Clone)]
pub struct MockTicketService {
    next_id: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
    created: Arc<Mutex<Vec<NewTicket>>>,
}

impl Default for MockTicketService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTicketService {
    pub fn new() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1000)),
            failing: Arc::new(AtomicBool::new(false)),
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Ticket requests received, including failed ones.
    pub fn requests(&self) -> Vec<NewTicket> {
        match self.created.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl TicketService for MockTicketService {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, RelayError> {
        let subject = ticket.subject.clone();
        match self.created.lock() {
            Ok(mut guard) => guard.push(ticket),
            Err(poisoned) => poisoned.into_inner().push(ticket),
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::Ticketing("mock ticketing unavailable".into()));
        }
        Ok(Ticket {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            subject: Some(subject),
            status: Some("new".into()),
        })
    }
}

/// A message captured by [`MockMessageSender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub app_id: String,
    pub conversation_id: String,
    pub text: String,
}

/// Message sender for testing that records deliveries.
#[derive(Debug, Clone, Default)]
pub struct MockMessageSender {
    failing: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl MockMessageSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully delivered messages, in order.
    pub fn sent(&self) -> Vec<SentMessage> {
        match self.sent.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl MessageSender for MockMessageSender {
    async fn send(
        &self,
        app_id: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), RelayError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::Delivery("502 Bad Gateway".into()));
        }
        let message = SentMessage {
            app_id: app_id.to_string(),
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
        };
        match self.sent.lock() {
            Ok(mut guard) => guard.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
        Ok(())
    }
}
