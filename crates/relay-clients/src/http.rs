//! Shared HTTP plumbing for collaborator clients.

use std::time::Duration;

use relay_core::config::HttpConfig;
use relay_core::error::RelayError;

/// Build the client shared by every collaborator.
pub fn build_http_client(config: &HttpConfig) -> Result<reqwest::Client, RelayError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| RelayError::Http(format!("Failed to create HTTP client: {}", e)))
}

/// Root URL of a Zendesk account.
pub fn zendesk_base_url(subdomain: &str) -> String {
    format!("https://{}.zendesk.com", subdomain.trim())
}

/// Describe a non-success response as `"HTTP <code>: <body>"`.
pub(crate) async fn describe_failure(response: reqwest::Response) -> String {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    format!("HTTP {}: {}", status, body)
}
