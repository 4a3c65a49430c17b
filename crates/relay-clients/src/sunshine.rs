//! Sunshine Conversations message delivery.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use relay_chat::MessageSender;
use relay_core::config::{SunshineConfig, ZendeskConfig};
use relay_core::error::RelayError;

use crate::http::{describe_failure, zendesk_base_url};

/// Posts business-authored text messages into conversations.
pub struct SunshineClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    secret_key: String,
}

impl SunshineClient {
    /// The messaging subdomain falls back to the Zendesk one when unset.
    pub fn new(client: reqwest::Client, sunshine: &SunshineConfig, zendesk: &ZendeskConfig) -> Self {
        let subdomain = if sunshine.subdomain.trim().is_empty() {
            &zendesk.subdomain
        } else {
            &sunshine.subdomain
        };
        Self::with_base_url(
            client,
            zendesk_base_url(subdomain),
            &sunshine.key_id,
            &sunshine.secret_key,
        )
    }

    pub fn with_base_url(
        client: reqwest::Client,
        base_url: impl Into<String>,
        key_id: &str,
        secret_key: &str,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    pub fn messages_url(&self, app_id: &str, conversation_id: &str) -> String {
        format!(
            "{}/sc/v2/apps/{}/conversations/{}/messages",
            self.base_url, app_id, conversation_id
        )
    }
}

#[async_trait]
impl MessageSender for SunshineClient {
    async fn send(
        &self,
        app_id: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), RelayError> {
        let body = json!({
            "author": { "type": "business" },
            "content": { "type": "text", "text": text },
        });

        let response = self
            .client
            .post(self.messages_url(app_id, conversation_id))
            .basic_auth(&self.key_id, Some(&self.secret_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RelayError::Delivery(describe_failure(response).await));
        }

        info!(app_id, conversation_id, "Reply delivered");
        Ok(())
    }
}
