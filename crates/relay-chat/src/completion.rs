//! Completion service seam.
//!
//! The response generator talks to the language model only through
//! [`CompletionService`]; the HTTP implementation lives in `relay-clients`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;

use relay_core::config::OpenAiConfig;
use relay_core::error::RelayError;
use relay_core::types::ChatMessage;

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 500,
        }
    }
}

impl From<&OpenAiConfig> for CompletionParams {
    fn from(config: &OpenAiConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }
}

/// A single chat completion request: system instruction plus history.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    /// Prior turns in chronological order, ending with the latest user turn.
    pub messages: Vec<ChatMessage>,
    pub params: CompletionParams,
}

/// Produces the assistant reply for a request.
///
/// Implementations return `RelayError::Generation` for transport failures,
/// timeouts and replies without usable content.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, RelayError>;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Scripted completion service for testing.
///
/// Replies are served in order; once the script is exhausted the default
/// reply is returned. Every request is recorded.
#[derive(Debug, Clone, Default)]
pub struct MockCompletion {
    replies: Arc<Mutex<VecDeque<Result<String, String>>>>,
    default_reply: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    calls: Arc<AtomicUsize>,
}

impl MockCompletion {
    /// Always answers with `reply`.
    pub fn answering(reply: impl Into<String>) -> Self {
        Self {
            default_reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Always fails with a generation error.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Queue a one-off failure ahead of the default reply.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.lock_replies().push_back(Err(reason.into()));
    }

    /// Queue a one-off reply ahead of the default reply.
    pub fn push_reply(&self, reply: impl Into<String>) {
        self.lock_replies().push_back(Ok(reply.into()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        match self.replies.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, RelayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request),
            Err(poisoned) => poisoned.into_inner().push(request),
        }

        let scripted = self.lock_replies().pop_front();
        match scripted {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(RelayError::Generation(reason)),
            None => self
                .default_reply
                .clone()
                .ok_or_else(|| RelayError::Generation("mock completion unavailable".into())),
        }
    }
}
