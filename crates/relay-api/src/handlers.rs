//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors,
//! interacts with AppState services, and returns JSON responses.

use std::net::SocketAddr;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use relay_chat::DispatchOutcome;
use relay_core::types::ConversationSession;
use relay_storage::{
    ConversationRecord, ConversationRepository, LogStats, MessageRecord, MessageRepository,
    NewWebhookLog, ProcessingStatus, WebhookLog, WebhookLogRepository,
};

use crate::error::ApiError;
use crate::payload::{NormalizedEvent, WebhookPayload};
use crate::signature::{signature_header, verify_signature};
use crate::state::AppState;

/// Reported by `/health`.
pub const SERVICE_NAME: &str = "helpdesk-relay";

/// Largest webhook body accepted.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const DEFAULT_LOG_LIMIT: u32 = 50;
const MAX_LOG_LIMIT: u32 = 500;

/// Headers never written to the event log.
const REDACTED_HEADERS: [&str; 2] = ["authorization", "cookie"];

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LogListParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestStatusResponse {
    pub status: String,
    pub knowledge_base_size: usize,
    pub vocabulary_size: usize,
    pub configured: bool,
    pub active_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub loaded: usize,
    pub knowledge_base_size: usize,
    pub vocabulary_size: usize,
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    pub logs: Vec<WebhookLog>,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
    pub conversations: Vec<ConversationRecord>,
}

#[derive(Debug, Serialize)]
pub struct ConversationMessagesResponse {
    pub conversation: ConversationRecord,
    pub messages: Vec<MessageRecord>,
}

/// One reply sent while handling a webhook.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReplySummary {
    pub conversation_id: String,
    /// `answered` or `escalated`.
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// `success` when at least one reply was sent, `ignored` otherwise.
    pub status: String,
    pub log_id: Option<i64>,
    pub events_processed: usize,
    pub replies: Vec<ReplySummary>,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /test
pub async fn test_status(State(state): State<AppState>) -> Json<TestStatusResponse> {
    Json(TestStatusResponse {
        status: "ok".to_string(),
        knowledge_base_size: state.index.len(),
        vocabulary_size: state.index.vocabulary_size(),
        configured: state.is_configured(),
        active_sessions: state.context.len(),
        timestamp: Utc::now(),
    })
}

/// GET /debug/conversation/{session_id}
pub async fn debug_conversation(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationSession>, ApiError> {
    state
        .context
        .session(&session_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", session_id)))
}

/// POST /knowledge/reload
///
/// A failed fetch keeps the current index and reports `loaded: 0`.
pub async fn reload_knowledge(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let source = state.article_source.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("knowledge source not configured".to_string())
    })?;

    let loaded = state
        .index
        .load(source.as_ref(), &state.config.zendesk.kb_category)
        .await;
    info!(loaded, "Knowledge base reload requested");

    Ok(Json(ReloadResponse {
        loaded,
        knowledge_base_size: state.index.len(),
        vocabulary_size: state.index.vocabulary_size(),
    }))
}

// =============================================================================
// Event log inspection
// =============================================================================

/// GET /api/webhook-logs
pub async fn list_webhook_logs(
    State(state): State<AppState>,
    Query(params): Query<LogListParams>,
) -> Result<Json<LogListResponse>, ApiError> {
    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            ProcessingStatus::from_str(s)
                .map_err(|_| ApiError::BadRequest(format!("Invalid status filter: {}", s)))?,
        ),
        None => None,
    };
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let page = WebhookLogRepository::new(state.database.clone()).list_logs(limit, offset, status)?;
    Ok(Json(LogListResponse {
        total: page.total,
        limit,
        offset,
        logs: page.logs,
    }))
}

/// GET /api/webhook-logs/stats
pub async fn webhook_log_stats(State(state): State<AppState>) -> Result<Json<LogStats>, ApiError> {
    let stats = WebhookLogRepository::new(state.database.clone()).log_stats()?;
    Ok(Json(stats))
}

/// GET /api/webhook-logs/{id}
pub async fn get_webhook_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<WebhookLog>, ApiError> {
    WebhookLogRepository::new(state.database.clone())
        .find_log(id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Webhook log {} not found", id)))
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let page =
        ConversationRepository::new(state.database.clone()).list_conversations(limit, offset)?;
    Ok(Json(ConversationListResponse {
        total: page.total,
        offset,
        limit,
        conversations: page.conversations,
    }))
}

/// GET /api/conversations/{external_id}/messages
pub async fn conversation_messages(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<ConversationMessagesResponse>, ApiError> {
    let conversation = ConversationRepository::new(state.database.clone())
        .find_conversation(&external_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Conversation {} not found", external_id)))?;
    let messages = MessageRepository::new(state.database.clone()).list_messages(conversation.id)?;
    Ok(Json(ConversationMessagesResponse {
        conversation,
        messages,
    }))
}

// =============================================================================
// Webhook ingress
// =============================================================================

fn webhook_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "status": "error", "message": message.into() })),
    )
        .into_response()
}

fn mark_log(
    logs: &WebhookLogRepository,
    log_id: Option<i64>,
    status: ProcessingStatus,
    error_message: Option<&str>,
) {
    if let Some(id) = log_id {
        if let Err(e) = logs.update_status(id, status, error_message) {
            warn!(log_id = id, error = %e, "Failed to update webhook log status");
        }
    }
}

fn headers_json(headers: &HeaderMap) -> Value {
    let map = headers
        .iter()
        .filter(|(name, _)| !REDACTED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    Value::Object(map)
}

fn source_ip(request: &Request) -> Option<String> {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return Some(addr.ip().to_string());
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Record extracted conversations and messages. Failures are only logged.
fn persist_events(state: &AppState, events: &[NormalizedEvent], log_id: Option<i64>) {
    let conversations = ConversationRepository::new(state.database.clone());
    let messages = MessageRepository::new(state.database.clone());

    for event in events {
        let conversation = match conversations.get_or_create_conversation(
            &event.conversation_id,
            event.app_id.as_deref(),
            event.user.as_ref(),
        ) {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!(conversation_id = %event.conversation_id, error = %e, "Failed to record conversation");
                continue;
            }
        };
        for message in event.new_messages(log_id) {
            if let Err(e) = messages.save_message(conversation.id, &message) {
                warn!(conversation_id = %event.conversation_id, error = %e, "Failed to record message");
            }
        }
    }
}

/// POST /webhook/sunshine, POST /webhook/zendesk
///
/// Every delivery is logged as `pending` first and finished as `success` or
/// `error`. Only signature failures (401), demo mode (503), invalid JSON (400)
/// and delivery failures (500) are reported as errors; everything else the
/// end user sees is an answer, a handoff or an apology.
pub async fn webhook(State(state): State<AppState>, request: Request) -> Response {
    let ip = source_ip(&request);
    let (parts, body) = request.into_parts();

    let body: Bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to read webhook body");
            return webhook_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
        }
    };

    let logs = WebhookLogRepository::new(state.database.clone());
    let log_id = match logs.create_log(&NewWebhookLog {
        source_ip: ip,
        headers: headers_json(&parts.headers),
        payload: serde_json::from_slice(&body).ok(),
        raw_body: String::from_utf8_lossy(&body).into_owned(),
    }) {
        Ok(id) => Some(id),
        Err(e) => {
            error!(error = %e, "Failed to record webhook delivery");
            None
        }
    };

    if let Err(e) = verify_signature(
        &body,
        signature_header(&parts.headers),
        state.config.webhook_secret(),
    ) {
        warn!(log_id, error = %e, "Rejected webhook with invalid signature");
        let message = e.to_string();
        mark_log(&logs, log_id, ProcessingStatus::Error, Some(&message));
        return webhook_error(StatusCode::UNAUTHORIZED, message);
    }

    let Some(dispatcher) = state.dispatcher.clone() else {
        warn!(log_id, "Webhook received in demo mode");
        mark_log(&logs, log_id, ProcessingStatus::Error, Some("service not configured"));
        return webhook_error(StatusCode::SERVICE_UNAVAILABLE, "service not configured");
    };

    let payload = match WebhookPayload::parse(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let message = format!("invalid JSON payload: {}", e);
            mark_log(&logs, log_id, ProcessingStatus::Error, Some(&message));
            return webhook_error(StatusCode::BAD_REQUEST, message);
        }
    };

    let events = payload.normalize();
    debug!(log_id, events = events.len(), "Webhook payload normalized");
    persist_events(&state, &events, log_id);

    let mut replies = Vec::new();
    for event in &events {
        for message in event.inbound_messages() {
            match dispatcher.dispatch(&message).await {
                Ok(DispatchOutcome::Ignored) => {}
                Ok(DispatchOutcome::Answered { .. }) => replies.push(ReplySummary {
                    conversation_id: message.conversation_id.clone(),
                    outcome: "answered".to_string(),
                    ticket_id: None,
                }),
                Ok(DispatchOutcome::Escalated { ticket_id, .. }) => replies.push(ReplySummary {
                    conversation_id: message.conversation_id.clone(),
                    outcome: "escalated".to_string(),
                    ticket_id,
                }),
                Err(e) => {
                    let message = e.to_string();
                    mark_log(&logs, log_id, ProcessingStatus::Error, Some(&message));
                    return webhook_error(StatusCode::INTERNAL_SERVER_ERROR, message);
                }
            }
        }
    }

    mark_log(&logs, log_id, ProcessingStatus::Success, None);
    info!(log_id, events = events.len(), replies = replies.len(), "Webhook processed");

    let status = if replies.is_empty() { "ignored" } else { "success" };
    Json(WebhookResponse {
        status: status.to_string(),
        log_id,
        events_processed: events.len(),
        replies,
    })
    .into_response()
}
