//! Integration tests for the relay HTTP API.
//!
//! Drives the router with `oneshot` against in-memory SQLite and in-process
//! mock collaborators. Each test is independent with its own state.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use relay_api::handlers::{HealthResponse, ReloadResponse, TestStatusResponse, WebhookResponse};
use relay_api::signature::sign;
use relay_api::{create_router, AppState};
use relay_chat::{
    CompletionParams, ContextStore, DispatcherSettings, MockCompletion, MockMessageSender,
    MockTicketService, ResponseGenerator, WebhookDispatcher, FALLBACK_REPLY,
};
use relay_core::config::RelayConfig;
use relay_core::types::Article;
use relay_knowledge::{ArticleIndex, IndexSettings, StaticArticleSource};
use relay_storage::Database;

// =============================================================================
// Helpers
// =============================================================================

const SECRET: &str = "webhook-secret";

fn article(id: u64, title: &str, body: &str) -> Article {
    Article {
        id,
        title: title.to_string(),
        body: body.to_string(),
        url: None,
    }
}

fn articles() -> Vec<Article> {
    vec![
        article(
            1,
            "Taxa de juros do empréstimo",
            "A taxa de juros do empréstimo pessoal começa em 1,99% ao mês.",
        ),
        article(
            2,
            "Como alterar a senha",
            "Acesse o aplicativo, vá em configurações e escolha alterar senha.",
        ),
        article(
            3,
            "Prazo de análise de crédito",
            "A análise de crédito leva até dois dias úteis.",
        ),
    ]
}

/// Handles to the mocks behind a configured state.
struct Harness {
    state: AppState,
    completion: MockCompletion,
    tickets: MockTicketService,
    sender: MockMessageSender,
    source: Arc<StaticArticleSource>,
}

fn make_configured(secret: Option<&str>) -> Harness {
    let mut config = RelayConfig::default();
    config.webhook.secret = secret.map(str::to_string);

    let index = Arc::new(ArticleIndex::from_articles(articles(), IndexSettings::default()));
    let context = Arc::new(ContextStore::new());
    let completion = MockCompletion::answering("A taxa começa em 1,99% ao mês.");
    let tickets = MockTicketService::new();
    let sender = MockMessageSender::new();
    let source = Arc::new(StaticArticleSource::new(articles()));

    let generator = ResponseGenerator::new(
        Arc::clone(&context),
        Arc::new(completion.clone()),
        None,
        CompletionParams::default(),
    );
    let dispatcher = WebhookDispatcher::new(
        Arc::clone(&index),
        Arc::clone(&context),
        generator,
        Arc::new(tickets.clone()),
        Arc::new(sender.clone()),
        DispatcherSettings::default(),
    );

    let state = AppState::new(config, index, context, Database::in_memory().unwrap())
        .with_dispatcher(dispatcher)
        .with_article_source(source.clone());

    Harness {
        state,
        completion,
        tickets,
        sender,
        source,
    }
}

fn make_demo() -> AppState {
    AppState::new(
        RelayConfig::default(),
        Arc::new(ArticleIndex::new(IndexSettings::default())),
        Arc::new(ContextStore::new()),
        Database::in_memory().unwrap(),
    )
}

async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_webhook(uri: &str, body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("x-smooch-signature", sig);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn legacy_payload(conversation: &str, text: &str) -> String {
    serde_json::json!({
        "app": {"id": "app1"},
        "conversation": {"id": conversation},
        "message": {
            "id": "msg-1",
            "author": {"type": "user", "userId": "user-1", "displayName": "Maria"},
            "content": {"type": "text", "text": text}
        }
    })
    .to_string()
}

// =============================================================================
// Diagnostics
// =============================================================================

#[tokio::test]
async fn test_health() {
    let resp = create_router(make_demo()).oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "helpdesk-relay");
}

#[tokio::test]
async fn test_status_reports_index_and_configuration() {
    let h = make_configured(None);
    let resp = create_router(h.state).oneshot(get("/test")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let status: TestStatusResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(status.status, "ok");
    assert_eq!(status.knowledge_base_size, 3);
    assert!(status.vocabulary_size > 0);
    assert!(status.configured);
    assert_eq!(status.active_sessions, 0);

    let resp = create_router(make_demo()).oneshot(get("/test")).await.unwrap();
    let status: TestStatusResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(!status.configured);
    assert_eq!(status.knowledge_base_size, 0);
}

#[tokio::test]
async fn test_debug_conversation() {
    let h = make_configured(None);
    let app = create_router(h.state.clone());

    let resp = app
        .clone()
        .oneshot(get("/debug/conversation/app1_unknown"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .clone()
        .oneshot(post_webhook(
            "/webhook/sunshine",
            &legacy_payload("conv1", "Qual a taxa de juros do empréstimo?"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/debug/conversation/app1_conv1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session = body_json(resp).await;
    assert_eq!(session["session_id"], "app1_conv1");
    assert_eq!(session["turns"].as_array().unwrap().len(), 2);
    assert_eq!(session["turns"][0]["role"], "user");
    assert_eq!(session["turns"][1]["role"], "assistant");
}

#[tokio::test]
async fn test_knowledge_reload() {
    let h = make_configured(None);
    let app = create_router(h.state.clone());

    let req = Request::post("/knowledge/reload").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let reload: ReloadResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(reload.loaded, 3);
    assert_eq!(reload.knowledge_base_size, 3);

    // A failed reload keeps the current index.
    h.source.set_failing(true);
    let req = Request::post("/knowledge/reload").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let reload: ReloadResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(reload.loaded, 0);
    assert_eq!(reload.knowledge_base_size, 3);
}

#[tokio::test]
async fn test_knowledge_reload_demo_mode() {
    let req = Request::post("/knowledge/reload").body(Body::empty()).unwrap();
    let resp = create_router(make_demo()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(resp).await["error"], "service_unavailable");
}

// =============================================================================
// Webhook: signature and demo mode
// =============================================================================

#[tokio::test]
async fn test_webhook_valid_signature_accepted() {
    let h = make_configured(Some(SECRET));
    let body = legacy_payload("conv1", "Qual a taxa de juros do empréstimo?");
    let sig = sign(body.as_bytes(), SECRET).unwrap();

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/sunshine", &body, Some(&sig)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.sender.sent().len(), 1);
}

#[tokio::test]
async fn test_webhook_zendesk_signature_header() {
    let h = make_configured(Some(SECRET));
    let body = legacy_payload("conv1", "Como alterar a senha?");
    let sig = sign(body.as_bytes(), SECRET).unwrap();

    let req = Request::post("/webhook/zendesk")
        .header("content-type", "application/json")
        .header("x-zendesk-webhook-signature", sig)
        .body(Body::from(body))
        .unwrap();
    let resp = create_router(h.state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_invalid_signature_rejected() {
    let h = make_configured(Some(SECRET));
    let app = create_router(h.state.clone());
    let body = legacy_payload("conv1", "Qual a taxa de juros do empréstimo?");
    let wrong = sign(body.as_bytes(), "not-the-secret").unwrap();

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", &body, Some(&wrong)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["status"], "error");

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Nothing was processed, and both deliveries were logged as errors.
    assert_eq!(h.completion.call_count(), 0);
    assert!(h.sender.sent().is_empty());
    assert!(h.state.context.is_empty());

    let resp = app.oneshot(get("/api/webhook-logs/stats")).await.unwrap();
    let stats = body_json(resp).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["by_status"]["error"], 2);
}

#[tokio::test]
async fn test_webhook_without_secret_accepts_any_signature() {
    let h = make_configured(None);
    let body = legacy_payload("conv1", "Qual a taxa de juros do empréstimo?");

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/sunshine", &body, Some("sha256=garbage")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_demo_mode_returns_503() {
    let state = make_demo();
    let app = create_router(state);
    let body = legacy_payload("conv1", "Olá");

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "service not configured");

    // Diagnostics still work.
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_invalid_json_returns_400() {
    let h = make_configured(None);
    let app = create_router(h.state);

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", "{not json", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.oneshot(get("/api/webhook-logs?status=error")).await.unwrap();
    let page = body_json(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["logs"][0]["raw_body"], "{not json");
    assert!(page["logs"][0]["payload"].is_null());
}

// =============================================================================
// Webhook: dispatch
// =============================================================================

#[tokio::test]
async fn test_webhook_knowledge_question_answered() {
    let h = make_configured(None);
    let body = legacy_payload("conv1", "Qual a taxa de juros do empréstimo?");

    let resp = create_router(h.state.clone())
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let result: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(result.status, "success");
    assert_eq!(result.events_processed, 1);
    assert_eq!(result.replies.len(), 1);
    assert_eq!(result.replies[0].outcome, "answered");
    assert!(result.log_id.is_some());

    assert_eq!(h.completion.call_count(), 1);
    let request = &h.completion.requests()[0];
    assert!(request.system.contains("Taxa de juros do empréstimo"));

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].app_id, "app1");
    assert_eq!(sent[0].conversation_id, "conv1");
    assert_eq!(sent[0].text, "A taxa começa em 1,99% ao mês.");
    assert!(h.tickets.requests().is_empty());
}

#[tokio::test]
async fn test_webhook_interest_rate_question_uses_matching_article() {
    let h = make_configured(None);
    let body = legacy_payload("conv1", "Qual a taxa de juros?");

    let resp = create_router(h.state.clone())
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(result.replies[0].outcome, "answered");

    assert_eq!(h.completion.call_count(), 1);
    let system = &h.completion.requests()[0].system;
    assert!(system.contains("Artigos relevantes da base"));
    assert!(system.contains("Taxa de juros do empréstimo"));
    assert!(!system.contains("Como alterar a senha"));
    assert_eq!(h.sender.sent()[0].text, "A taxa começa em 1,99% ao mês.");
    assert!(h.tickets.requests().is_empty());
}

#[tokio::test]
async fn test_webhook_explicit_request_escalates() {
    let h = make_configured(None);
    let body = legacy_payload("conv1", "Quero falar com um atendente agora");

    let resp = create_router(h.state.clone())
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let result: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(result.replies[0].outcome, "escalated");
    assert_eq!(result.replies[0].ticket_id.as_deref(), Some("1000"));

    assert_eq!(h.completion.call_count(), 0);
    let tickets = h.tickets.requests();
    assert_eq!(tickets.len(), 1);
    assert!(tickets[0].subject.starts_with("Escalação automática: "));
    assert_eq!(tickets[0].description, "Cliente escalou conversa de crédito.\n\n");
    assert!(h.sender.sent()[0].text.ends_with("Ticket #: 1000"));
}

#[tokio::test]
async fn test_webhook_agent_request_about_error_escalates() {
    let h = make_configured(None);
    let body = legacy_payload("conv2", "Quero falar com um agente sobre um erro");

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/zendesk", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(h.tickets.requests().len(), 1);
    assert_eq!(h.completion.call_count(), 0);
    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.contains("Ticket #: 1000"));
}

#[tokio::test]
async fn test_webhook_generation_failure_sends_fallback() {
    let h = make_configured(None);
    h.completion.push_failure("upstream timeout");
    let body = legacy_payload("conv1", "Qual a taxa de juros do empréstimo?");

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(h.sender.sent()[0].text, FALLBACK_REPLY);
    assert!(h.tickets.requests().is_empty());
}

#[tokio::test]
async fn test_webhook_delivery_failure_returns_500() {
    let h = make_configured(None);
    h.sender.set_failing(true);
    let app = create_router(h.state);
    let body = legacy_payload("conv1", "Qual a taxa de juros do empréstimo?");

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await["status"], "error");

    let resp = app.oneshot(get("/api/webhook-logs")).await.unwrap();
    let page = body_json(resp).await;
    assert_eq!(page["logs"][0]["processing_status"], "error");
    assert!(page["logs"][0]["error_message"]
        .as_str()
        .unwrap()
        .contains("502 Bad Gateway"));
}

#[tokio::test]
async fn test_webhook_business_message_ignored() {
    let h = make_configured(None);
    let body = serde_json::json!({
        "app": {"id": "app1"},
        "conversation": {"id": "conv1"},
        "message": {"author": {"type": "business"}, "content": {"type": "text", "text": "Olá!"}}
    })
    .to_string();

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(result.status, "ignored");
    assert!(result.replies.is_empty());
    assert!(h.sender.sent().is_empty());
    assert_eq!(h.completion.call_count(), 0);
}

#[tokio::test]
async fn test_webhook_event_batch_processed_and_recorded() {
    let h = make_configured(None);
    let app = create_router(h.state.clone());
    let body = serde_json::json!({
        "app": {"id": "app1"},
        "events": [
            {"type": "conversation:create", "payload": {
                "conversation": {"id": "conv-new"},
                "user": {"id": "user-2", "externalId": "cpf-123"}
            }},
            {"type": "conversation:message", "payload": {
                "conversation": {"id": "conv-batch"},
                "user": {"id": "user-1"},
                "messages": [
                    {"id": "m1", "author": {"type": "user", "userId": "user-1"},
                     "content": {"type": "text", "text": "Qual o prazo de análise de crédito?"}},
                    {"id": "m2", "author": {"type": "business"},
                     "content": {"type": "text", "text": "Um momento"}}
                ]
            }},
            {"type": "conversation:read", "payload": {"conversation": {"id": "conv-batch"}}}
        ]
    })
    .to_string();

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(result.events_processed, 2);
    assert_eq!(result.replies.len(), 1);
    assert_eq!(result.replies[0].conversation_id, "conv-batch");
    assert_eq!(h.sender.sent().len(), 1);

    let resp = app
        .clone()
        .oneshot(get("/api/conversations/conv-batch/messages"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["conversation"]["external_app_id"], "app1");
    assert_eq!(json["conversation"]["user_id"], "user-1");
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["external_message_id"], "m1");
    assert_eq!(messages[1]["author_type"], "business");
    assert_eq!(messages[0]["webhook_log_id"], result.log_id.unwrap());

    let resp = app
        .clone()
        .oneshot(get("/api/conversations/conv-new/messages"))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["conversation"]["user_external_id"], "cpf-123");
    assert!(json["messages"].as_array().unwrap().is_empty());

    let resp = app
        .oneshot(get("/api/conversations/missing/messages"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_event_batch_with_null_messages_escalates() {
    let h = make_configured(None);
    let body = serde_json::json!({
        "app": {"id": "app1"},
        "events": [
            {"type": "conversation:message", "payload": {
                "conversation": {"id": "conv1"},
                "messages": null,
                "message": {"id": "m1", "author": {"type": "user", "userId": "user-1"},
                            "content": {"type": "text", "text": "Quero falar com um agente"}}
            }}
        ]
    })
    .to_string();

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/sunshine", &body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let result: WebhookResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(result.events_processed, 1);
    assert_eq!(result.replies[0].outcome, "escalated");
    assert_eq!(h.tickets.requests().len(), 1);
    assert_eq!(h.sender.sent()[0].conversation_id, "conv1");
}

#[tokio::test]
async fn test_webhook_malformed_event_batch_returns_400() {
    let h = make_configured(None);
    let app = create_router(h.state);
    let body = r#"{"app": {"id": "app1"}, "events": [{"type": "conversation:message",
        "payload": {"conversation": {"id": "conv1"}, "messages": "oi"}}]}"#;

    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(h.sender.sent().is_empty());

    let resp = app.oneshot(get("/api/webhook-logs?status=error")).await.unwrap();
    let page = body_json(resp).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["logs"][0]["payload"]["app"]["id"], "app1");
}

// =============================================================================
// Event log inspection
// =============================================================================

#[tokio::test]
async fn test_webhook_log_endpoints() {
    let h = make_configured(None);
    let app = create_router(h.state);

    for text in ["Como alterar a senha?", "Qual a taxa de juros do empréstimo?"] {
        let resp = app
            .clone()
            .oneshot(post_webhook("/webhook/sunshine", &legacy_payload("conv1", text), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app
        .clone()
        .oneshot(post_webhook("/webhook/sunshine", "[]", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.clone().oneshot(get("/api/webhook-logs")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 50);
    let logs = page["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 3);
    // Newest first.
    assert_eq!(logs[0]["raw_body"], "[]");
    let first_id = logs[2]["id"].as_i64().unwrap();

    let resp = app
        .clone()
        .oneshot(get("/api/webhook-logs?status=success&limit=1&offset=1"))
        .await
        .unwrap();
    let page = body_json(resp).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["logs"].as_array().unwrap().len(), 1);
    assert_eq!(page["logs"][0]["id"], first_id);

    let resp = app
        .clone()
        .oneshot(get("/api/webhook-logs?status=done"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.clone().oneshot(get("/api/webhook-logs/stats")).await.unwrap();
    let stats = body_json(resp).await;
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["by_status"]["success"], 2);
    assert_eq!(stats["by_status"]["error"], 1);

    let resp = app
        .clone()
        .oneshot(get(&format!("/api/webhook-logs/{}", first_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let log = body_json(resp).await;
    assert_eq!(log["processing_status"], "success");
    assert_eq!(log["payload"]["conversation"]["id"], "conv1");
    assert_eq!(log["headers"]["content-type"], "application/json");
    assert!(log["processed_at"].is_string());

    let resp = app.oneshot(get("/api/webhook-logs/9999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conversation_list_pages() {
    let h = make_configured(None);
    let app = create_router(h.state);

    let resp = app.clone().oneshot(get("/api/conversations")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["total"], 0);
    assert_eq!(page["limit"], 50);
    assert_eq!(page["offset"], 0);
    assert!(page["conversations"].as_array().unwrap().is_empty());

    for conversation in ["conv1", "conv2"] {
        let body = legacy_payload(conversation, "Como alterar a senha?");
        let resp = app
            .clone()
            .oneshot(post_webhook("/webhook/sunshine", &body, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(get("/api/conversations?limit=1&offset=1"))
        .await
        .unwrap();
    let page = body_json(resp).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["limit"], 1);
    assert_eq!(page["offset"], 1);
    let conversations = page["conversations"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["external_conversation_id"], "conv1");
    assert_eq!(conversations[0]["external_app_id"], "app1");
    assert_eq!(conversations[0]["status"], "active");

    let resp = app.oneshot(get("/api/conversations?limit=0")).await.unwrap();
    let page = body_json(resp).await;
    assert_eq!(page["limit"], 1);
}

#[tokio::test]
async fn test_webhook_body_limit() {
    let h = make_configured(None);
    let huge = format!("{{\"padding\": \"{}\"}}", "x".repeat(2 * 1024 * 1024));

    let resp = create_router(h.state)
        .oneshot(post_webhook("/webhook/sunshine", &huge, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
