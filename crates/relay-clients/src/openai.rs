//! OpenAI-compatible chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use relay_chat::{CompletionRequest, CompletionService};
use relay_core::config::OpenAiConfig;
use relay_core::error::RelayError;
use relay_core::types::ChatMessage;

use crate::http::describe_failure;

/// Completion client for any endpoint speaking the OpenAI chat API.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// Content of the first choice; `None` when absent, null or blank.
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
    }
}

impl OpenAiClient {
    pub fn new(client: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: Some(config.api_key.clone()).filter(|k| !k.is_empty()),
        }
    }

    /// Resolve the chat completions endpoint from the base URL.
    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn body(&self, request: CompletionRequest) -> ChatCompletionBody<'_> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::new("system", request.system));
        messages.extend(request.messages);
        ChatCompletionBody {
            model: &self.model,
            messages,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            max_tokens: request.params.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, RelayError> {
        let body = self.body(request);
        debug!(model = %self.model, messages = body.messages.len(), "Requesting completion");

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|e| RelayError::Generation(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RelayError::Generation(describe_failure(response).await));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Generation(format!("Malformed completion response: {}", e)))?;
        parsed
            .into_content()
            .ok_or_else(|| RelayError::Generation("Completion returned no content".into()))
    }
}
