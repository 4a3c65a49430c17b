//! Zendesk Support ticket creation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use relay_chat::TicketService;
use relay_core::config::ZendeskConfig;
use relay_core::error::RelayError;
use relay_core::types::{NewTicket, Ticket};

use crate::http::{describe_failure, zendesk_base_url};

/// Opens escalation tickets through the Zendesk Support API.
pub struct ZendeskTicketClient {
    client: reqwest::Client,
    base_url: String,
    email: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CreateTicketRequest<'a> {
    ticket: TicketBody<'a>,
}

#[derive(Debug, Serialize)]
struct TicketBody<'a> {
    subject: &'a str,
    description: &'a str,
    priority: &'static str,
    tags: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CreateTicketResponse {
    ticket: Ticket,
}

impl ZendeskTicketClient {
    pub fn new(client: reqwest::Client, config: &ZendeskConfig) -> Self {
        Self::with_base_url(
            client,
            zendesk_base_url(&config.subdomain),
            &config.email,
            &config.api_key,
        )
    }

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

    fn endpoint(&self) -> String {
        format!("{}/api/v2/tickets.json", self.base_url)
    }
}

fn request_body(ticket: &NewTicket) -> CreateTicketRequest<'_> {
    CreateTicketRequest {
        ticket: TicketBody {
            subject: &ticket.subject,
            description: &ticket.description,
            priority: "normal",
            tags: &ticket.tags,
        },
    }
}

#[async_trait]
impl TicketService for ZendeskTicketClient {
    async fn create_ticket(&self, ticket: NewTicket) -> Result<Ticket, RelayError> {
        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(format!("{}/token", self.email), Some(&self.api_key))
            .json(&request_body(&ticket))
            .send()
            .await
            .map_err(|e| RelayError::Ticketing(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 && status != 201 {
            return Err(RelayError::Ticketing(describe_failure(response).await));
        }

        let body: CreateTicketResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Ticketing(format!("Malformed ticket response: {}", e)))?;
        info!(ticket_id = body.ticket.id, "Zendesk ticket created");
        Ok(body.ticket)
    }
}
