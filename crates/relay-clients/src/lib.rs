//! HTTP implementations of the relay's collaborator traits.
//!
//! - [`HelpCenterClient`]: knowledge-base articles (`ArticleSource`)
//! - [`ZendeskTicketClient`]: support tickets (`TicketService`)
//! - [`SunshineClient`]: conversation replies (`MessageSender`)
//! - [`OpenAiClient`]: chat completions (`CompletionService`)
//!
//! Every client shares one `reqwest::Client` built with the configured
//! timeout. Failures are reported, never retried.

pub mod help_center;
pub mod http;
pub mod openai;
pub mod sunshine;
pub mod tickets;

pub use help_center::HelpCenterClient;
pub use http::{build_http_client, zendesk_base_url};
pub use openai::OpenAiClient;
pub use sunshine::SunshineClient;
pub use tickets::ZendeskTicketClient;
