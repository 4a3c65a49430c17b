//! Webhook dispatcher: decides between answering and escalating each inbound
//! message, then delivers the reply.
//!
//! Per message: retrieve knowledge context, score escalation intent, branch
//! to ticket creation or grounded generation, send the resulting text back
//! into the conversation. Only delivery failures surface as errors; every
//! other collaborator failure has a user-facing fallback.

use std::sync::Arc;

use tracing::{error, info, warn};

use relay_core::config::RelayConfig;
use relay_core::types::{ArticleHit, InboundMessage, NewTicket};
use relay_knowledge::ArticleIndex;

use crate::collaborators::{MessageSender, TicketService};
use crate::context::ContextStore;
use crate::error::ChatError;
use crate::escalation::EscalationDetector;
use crate::response::ResponseGenerator;

/// Characters of the user message quoted in a ticket subject.
const SUBJECT_PREVIEW_CHARS: usize = 50;

/// Tags attached to every escalation ticket.
pub const ESCALATION_TAGS: &[&str] = &["relay_escalation", "credit", "escalated"];

/// Reply sent when a ticket could not be opened.
pub const TICKET_FAILURE_REPLY: &str =
    "Desculpe, tive um problema ao processar seu pedido. Por favor, tente novamente.";

/// Tunables for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatcherSettings {
    /// Articles retrieved per message.
    pub top_k: usize,
    /// Keyword score above which a message escalates.
    pub score_threshold: f64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            score_threshold: 0.5,
        }
    }
}

impl From<&RelayConfig> for DispatcherSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            top_k: config.knowledge.top_k,
            score_threshold: config.escalation.score_threshold,
        }
    }
}

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Not an end-user message, or no text.
    Ignored,
    Answered {
        reply: String,
    },
    Escalated {
        reply: String,
        /// Id of the created ticket; `None` when ticket creation failed.
        ticket_id: Option<String>,
    },
}

impl DispatchOutcome {
    /// Text delivered to the end user, if any.
    pub fn reply(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Ignored => None,
            DispatchOutcome::Answered { reply } | DispatchOutcome::Escalated { reply, .. } => {
                Some(reply)
            }
        }
    }
}

/// Central coordinator for inbound conversation messages.
pub struct WebhookDispatcher {
    index: Arc<ArticleIndex>,
    context: Arc<ContextStore>,
    detector: EscalationDetector,
    generator: ResponseGenerator,
    tickets: Arc<dyn TicketService>,
    sender: Arc<dyn MessageSender>,
    settings: DispatcherSettings,
}

impl WebhookDispatcher {
    /// `generator` must share `context` so escalation summaries include the
    /// turns it records.
    pub fn new(
        index: Arc<ArticleIndex>,
        context: Arc<ContextStore>,
        generator: ResponseGenerator,
        tickets: Arc<dyn TicketService>,
        sender: Arc<dyn MessageSender>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            index,
            context,
            detector: EscalationDetector::new(),
            generator,
            tickets,
            sender,
            settings,
        }
    }

    pub fn settings(&self) -> DispatcherSettings {
        self.settings
    }

    /// Process one inbound message end to end.
    pub async fn dispatch(&self, message: &InboundMessage) -> Result<DispatchOutcome, ChatError> {
        if !message.is_actionable() {
            return Ok(DispatchOutcome::Ignored);
        }

        let session_id = message.session_id();
        let text = message.text.as_str();

        let hits = self.index.search(text, self.settings.top_k);
        let knowledge_context = build_knowledge_context(&hits);
        let score = self.detector.detect(text);

        let outcome = if EscalationDetector::should_escalate(&score, self.settings.score_threshold)
        {
            info!(
                session_id = %session_id,
                matched = score.matched,
                score = score.score,
                "Escalating conversation"
            );
            self.escalate(&session_id, text).await
        } else {
            let reply = self
                .generator
                .respond(&session_id, text, &knowledge_context)
                .await;
            DispatchOutcome::Answered { reply }
        };

        let reply = outcome.reply().unwrap_or_default();
        if let Err(e) = self
            .sender
            .send(&message.app_id, &message.conversation_id, reply)
            .await
        {
            error!(
                session_id = %session_id,
                conversation_id = %message.conversation_id,
                error = %e,
                "Failed to deliver reply"
            );
            return Err(ChatError::Delivery {
                reply: reply.to_string(),
                reason: e.to_string(),
            });
        }

        Ok(outcome)
    }

    async fn escalate(&self, session_id: &str, text: &str) -> DispatchOutcome {
        let summary = self.context.summary(session_id);

        let preview: String = text.chars().take(SUBJECT_PREVIEW_CHARS).collect();
        let ticket = NewTicket {
            subject: format!("Escalação automática: {}...", preview),
            description: format!("Cliente escalou conversa de crédito.\n\n{}", summary),
            tags: ESCALATION_TAGS.iter().map(|t| t.to_string()).collect(),
        };

        match self.tickets.create_ticket(ticket).await {
            Ok(ticket) => {
                info!(session_id, ticket_id = ticket.id, "Ticket created");
                DispatchOutcome::Escalated {
                    reply: format!(
                        "Entendi sua solicitação. Estou conectando você com um agente humano \
                         que poderá ajudá-lo melhor. Ticket #: {}",
                        ticket.id
                    ),
                    ticket_id: Some(ticket.id.to_string()),
                }
            }
            Err(e) => {
                warn!(session_id, error = %e, "Ticket creation failed");
                DispatchOutcome::Escalated {
                    reply: TICKET_FAILURE_REPLY.to_string(),
                    ticket_id: None,
                }
            }
        }
    }
}

/// Render search hits as the knowledge context for generation.
///
/// Empty when there are no hits.
pub fn build_knowledge_context(hits: &[ArticleHit]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let mut context = String::from("Artigos relevantes da base:\n");
    for (i, hit) in hits.iter().enumerate() {
        context.push_str(&format!("\n{}. {}\n{}", i + 1, hit.title, hit.body_excerpt));
    }
    context
}
