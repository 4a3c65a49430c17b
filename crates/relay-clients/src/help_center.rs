//! Help Center article source.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use relay_core::config::ZendeskConfig;
use relay_core::error::RelayError;
use relay_core::types::{Article, ArticlePage};
use relay_knowledge::ArticleSource;

use crate::http::{describe_failure, zendesk_base_url};

/// Fetches knowledge-base articles from a Zendesk Help Center category.
pub struct HelpCenterClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ArticlesResponse {
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

impl ArticlesResponse {
    fn into_page(self) -> ArticlePage {
        // Cursor pagination reports `links.next`; offset pagination `next_page`.
        let next_page = self
            .links
            .and_then(|l| l.next)
            .or(self.next_page)
            .filter(|u| !u.is_empty());
        ArticlePage {
            articles: self.articles,
            next_page,
        }
    }
}

impl HelpCenterClient {
    pub fn new(client: reqwest::Client, config: &ZendeskConfig) -> Self {
        Self::with_base_url(
            client,
            zendesk_base_url(&config.subdomain),
            &config.email,
            &config.api_key,
        )
    }

    /// Point the client at an arbitrary host, e.g. a local test server.
    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        email: &str,
        api_key: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// First-page URL for a category.
    pub fn category_url(&self, category_id: &str) -> String {
        format!(
            "{}/api/v2/help_center/categories/{}/articles.json",
            self.base_url, category_id
        )
    }
}

#[async_trait]
impl ArticleSource for HelpCenterClient {
    async fn fetch_page(
        &self,
        category_id: &str,
        page_url: Option<&str>,
    ) -> Result<ArticlePage, RelayError> {
        let url = match page_url {
            Some(url) => url.to_string(),
            None => self.category_url(category_id),
        };
        debug!(url = %url, "Fetching help center page");

        let response = self
            .client
            .get(&url)
            .basic_auth(format!("{}/token", self.email), Some(&self.api_key))
            .send()
            .await
            .map_err(|e| RelayError::Retrieval(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Retrieval(describe_failure(response).await));
        }

        let body: ArticlesResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Retrieval(format!("Malformed articles response: {}", e)))?;
        Ok(body.into_page())
    }
}
