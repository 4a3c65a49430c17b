//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use relay_chat::{ContextStore, WebhookDispatcher};
use relay_core::config::RelayConfig;
use relay_knowledge::{ArticleIndex, ArticleSource};
use relay_storage::Database;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<RelayConfig>,
    /// Knowledge-base index, shared with the dispatcher.
    pub index: Arc<ArticleIndex>,
    /// Conversation history, shared with the dispatcher.
    pub context: Arc<ContextStore>,
    /// `None` in demo mode.
    pub dispatcher: Option<Arc<WebhookDispatcher>>,
    /// Where `/knowledge/reload` fetches articles from.
    pub article_source: Option<Arc<dyn ArticleSource>>,
    /// SQLite event log.
    pub database: Arc<Database>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// State without collaborators (demo mode).
    pub fn new(
        config: RelayConfig,
        index: Arc<ArticleIndex>,
        context: Arc<ContextStore>,
        database: Database,
    ) -> Self {
        Self {
            config: Arc::new(config),
            index,
            context,
            dispatcher: None,
            article_source: None,
            database: Arc::new(database),
            start_time: Instant::now(),
        }
    }

    /// Attach the dispatcher. It must share this state's index and context.
    pub fn with_dispatcher(mut self, dispatcher: WebhookDispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    pub fn with_article_source(mut self, source: Arc<dyn ArticleSource>) -> Self {
        self.article_source = Some(source);
        self
    }

    /// True when webhooks are processed rather than refused.
    pub fn is_configured(&self) -> bool {
        self.dispatcher.is_some()
    }
}
