//! Grounded reply generation.

use std::sync::Arc;

use tracing::{error, info};

use relay_core::types::Role;

use crate::completion::{CompletionParams, CompletionRequest, CompletionService};
use crate::context::ContextStore;

/// Reply used whenever the completion service cannot produce an answer.
pub const FALLBACK_REPLY: &str =
    "Desculpe, tive um problema ao processar sua solicitação. Vou conectar você com um agente humano.";

/// Turns of history sent with every completion request.
pub const HISTORY_LIMIT: usize = 10;

/// Built-in assistant persona, used when no override is configured.
pub const DEFAULT_PERSONA: &str = "Você é um assistente de atendimento especializado em crédito.

Suas responsabilidades:
1. Responder dúvidas sobre crédito de forma clara, amigável e precisa
2. Usar a base de conhecimento fornecida para dar informações corretas
3. Quando não souber a resposta, dizer isso e oferecer um agente humano
4. Prestar atenção aos problemas relatados pelo cliente
5. Diante de frustração ou pedido explícito por um humano, oferecer o encaminhamento

Comunicação:
- Tom profissional e amigável
- Respostas concisas e diretas";

/// Generates assistant replies from session history and knowledge context.
pub struct ResponseGenerator {
    context: Arc<ContextStore>,
    completion: Arc<dyn CompletionService>,
    persona: String,
    params: CompletionParams,
}

impl ResponseGenerator {
    pub fn new(
        context: Arc<ContextStore>,
        completion: Arc<dyn CompletionService>,
        persona: Option<String>,
        params: CompletionParams,
    ) -> Self {
        Self {
            context,
            completion,
            persona: persona
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            params,
        }
    }

    /// System instruction for a request, with the knowledge context appended
    /// when present.
    pub fn system_prompt(&self, knowledge_context: &str) -> String {
        if knowledge_context.is_empty() {
            self.persona.clone()
        } else {
            format!(
                "{}\n\nBase de conhecimento disponível:\n{}",
                self.persona, knowledge_context
            )
        }
    }

    /// Record the user turn and produce the assistant reply.
    ///
    /// On success both turns are in the session. On failure only the user
    /// turn is recorded and [`FALLBACK_REPLY`] is returned.
    pub async fn respond(
        &self,
        session_id: &str,
        user_message: &str,
        knowledge_context: &str,
    ) -> String {
        self.context.append(session_id, Role::User, user_message);

        let request = CompletionRequest {
            system: self.system_prompt(knowledge_context),
            messages: self.context.recent(session_id, HISTORY_LIMIT),
            params: self.params,
        };

        match self.completion.complete(request).await {
            Ok(reply) if !reply.trim().is_empty() => {
                self.context.append(session_id, Role::Assistant, &reply);
                info!(session_id, chars = reply.chars().count(), "Generated reply");
                reply
            }
            Ok(_) => {
                error!(session_id, "Completion returned empty content");
                FALLBACK_REPLY.to_string()
            }
            Err(e) => {
                error!(session_id, error = %e, "Completion failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
