//! helpdesk-relay binary - composition root.
//!
//! 1. Parse CLI flags, load TOML configuration, overlay env vars and flags
//! 2. Open the SQLite event log
//! 3. Build the HTTP collaborators and the webhook dispatcher, or fall back
//!    to demo mode when credentials are missing
//! 4. Load the knowledge base from the help center
//! 5. Start the axum server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use relay_api::{start_server, AppState};
use relay_chat::{
    CompletionParams, ContextStore, DispatcherSettings, ResponseGenerator, WebhookDispatcher,
};
use relay_clients::{
    build_http_client, HelpCenterClient, OpenAiClient, SunshineClient, ZendeskTicketClient,
};
use relay_core::config::RelayConfig;
use relay_core::error::RelayError;
use relay_knowledge::{ArticleIndex, ArticleSource, IndexSettings};
use relay_storage::Database;

use crate::cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if data_dir.starts_with("~/") || data_dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&data_dir[2..])
    } else {
        PathBuf::from(data_dir)
    }
}

/// Real collaborators for a fully configured deployment.
struct Services {
    dispatcher: WebhookDispatcher,
    article_source: Arc<dyn ArticleSource>,
}

fn build_services(
    config: &RelayConfig,
    index: &Arc<ArticleIndex>,
    context: &Arc<ContextStore>,
) -> Result<Services, RelayError> {
    let http = build_http_client(&config.http)?;

    let article_source: Arc<dyn ArticleSource> =
        Arc::new(HelpCenterClient::new(http.clone(), &config.zendesk));
    let tickets = Arc::new(ZendeskTicketClient::new(http.clone(), &config.zendesk));
    let sender = Arc::new(SunshineClient::new(
        http.clone(),
        &config.sunshine,
        &config.zendesk,
    ));
    let completion = Arc::new(OpenAiClient::new(http, &config.openai));

    let generator = ResponseGenerator::new(
        Arc::clone(context),
        completion,
        config.openai.persona_prompt.clone(),
        CompletionParams::from(&config.openai),
    );
    let dispatcher = WebhookDispatcher::new(
        Arc::clone(index),
        Arc::clone(context),
        generator,
        tickets,
        sender,
        DispatcherSettings::from(config),
    );

    Ok(Services {
        dispatcher,
        article_source,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config: file, then env, then flags.
    let config_file = args.resolve_config_path();
    let mut config = RelayConfig::load_or_default(&config_file);
    config.apply_env();
    args.apply_overrides(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting helpdesk-relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("relay.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite event log opened");

    // Shared index and conversation history.
    let index = Arc::new(ArticleIndex::new(IndexSettings::from(&config.knowledge)));
    let context = Arc::new(ContextStore::new());

    let mut state = AppState::new(config.clone(), Arc::clone(&index), Arc::clone(&context), db);

    let missing = config.missing_credentials();
    if missing.is_empty() {
        let services = build_services(&config, &index, &context)?;

        if args.skip_kb_load {
            tracing::info!("Knowledge base load skipped");
        } else {
            let loaded = index
                .load(services.article_source.as_ref(), &config.zendesk.kb_category)
                .await;
            if loaded == 0 {
                tracing::warn!("Knowledge base is empty; answers will rely on the model alone");
            }
        }

        state = state
            .with_dispatcher(services.dispatcher)
            .with_article_source(services.article_source);
    } else {
        tracing::warn!(
            missing = %missing.join(", "),
            "Running in demo mode; webhooks will be refused until credentials are set"
        );
    }

    if config.webhook_secret().is_none() {
        tracing::warn!("No webhook secret configured; signatures will not be verified");
    }

    start_server(&config, state).await?;

    Ok(())
}
