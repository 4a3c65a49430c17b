//! Inbound webhook payload shapes and their normalization.
//!
//! Two shapes arrive on the same endpoints:
//!
//! - event batch: `{app, events: [{type, payload: {conversation, user, messages | message}}]}`
//! - legacy single message: `{app, conversation, message, user}`
//!
//! Both are reduced to [`NormalizedEvent`]s before any dispatch logic runs.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_core::types::{AuthorType, InboundMessage};
use relay_storage::NewMessage;

/// A webhook body in either supported shape.
///
/// The shape is chosen by the presence of an `events` key, so a batch with a
/// malformed field is a parse error rather than an empty legacy payload.
#[derive(Debug, Clone)]
pub enum WebhookPayload {
    EventBatch(EventBatch),
    Legacy(LegacyPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub app: Option<IdRef>,
    /// Conversation used when an event does not carry its own.
    #[serde(default)]
    pub conversation: Option<IdRef>,
    #[serde(default)]
    pub user: Option<Value>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(default, rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub conversation: Option<IdRef>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<PlatformMessage>,
    #[serde(default)]
    pub message: Option<PlatformMessage>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<PlatformMessage>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Vec<PlatformMessage>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPayload {
    #[serde(default)]
    pub app: Option<IdRef>,
    #[serde(default)]
    pub conversation: Option<IdRef>,
    #[serde(default)]
    pub user: Option<Value>,
    #[serde(default)]
    pub message: Option<PlatformMessage>,
}

/// An object identified by `id`, e.g. `{"id": "app_123"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// A conversation message as sent by the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMessage {
    #[serde(default)]
    pub id: Option<String>,
    /// Platform timestamp, kept verbatim.
    #[serde(default)]
    pub received: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default, rename = "type")]
    pub author_type: Option<AuthorType>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl PlatformMessage {
    pub fn author_type(&self) -> AuthorType {
        self.author
            .as_ref()
            .and_then(|a| a.author_type.clone())
            .unwrap_or(AuthorType::Unknown)
    }

    /// `received` when it is a valid RFC 3339 timestamp.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received
            .as_deref()
            .and_then(|r| DateTime::parse_from_rfc3339(r).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn text(&self) -> &str {
        self.content
            .as_ref()
            .and_then(|c| c.text.as_deref())
            .unwrap_or_default()
    }
}

/// One conversation's worth of an inbound webhook.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub conversation_id: String,
    pub app_id: Option<String>,
    /// The platform's user object, if present.
    pub user: Option<Value>,
    pub messages: Vec<PlatformMessage>,
}

fn id_of(r: Option<&IdRef>) -> Option<String> {
    r.and_then(|r| r.id.clone()).filter(|id| !id.is_empty())
}

impl WebhookPayload {
    /// Parse a raw body. Fails on invalid JSON or a non-object body.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        let Some(object) = value.as_object() else {
            return Err(serde_json::Error::custom("webhook payload must be a JSON object"));
        };
        if object.contains_key("events") {
            serde_json::from_value(value).map(WebhookPayload::EventBatch)
        } else {
            serde_json::from_value(value).map(WebhookPayload::Legacy)
        }
    }

    /// Reduce the payload to canonical events.
    ///
    /// Events without a conversation id are dropped. Batch events other than
    /// `conversation:message`, `message` and `conversation:create` are ignored.
    pub fn normalize(&self) -> Vec<NormalizedEvent> {
        match self {
            WebhookPayload::EventBatch(batch) => {
                let app_id = id_of(batch.app.as_ref());
                batch
                    .events
                    .iter()
                    .filter_map(|event| {
                        let payload = &event.payload;
                        match event.event_type.as_str() {
                            "conversation:message" | "message" => {
                                let conversation_id = id_of(
                                    payload.conversation.as_ref().or(batch.conversation.as_ref()),
                                )?;
                                let messages = if payload.messages.is_empty() {
                                    payload.message.iter().cloned().collect()
                                } else {
                                    payload.messages.clone()
                                };
                                Some(NormalizedEvent {
                                    conversation_id,
                                    app_id: app_id.clone(),
                                    user: payload.user.clone().or_else(|| batch.user.clone()),
                                    messages,
                                })
                            }
                            "conversation:create" => Some(NormalizedEvent {
                                conversation_id: id_of(payload.conversation.as_ref())?,
                                app_id: app_id.clone(),
                                user: payload.user.clone(),
                                messages: Vec::new(),
                            }),
                            _ => None,
                        }
                    })
                    .collect()
            }
            WebhookPayload::Legacy(legacy) => {
                let Some(conversation_id) = id_of(legacy.conversation.as_ref()) else {
                    return Vec::new();
                };
                vec![NormalizedEvent {
                    conversation_id,
                    app_id: id_of(legacy.app.as_ref()),
                    user: legacy.user.clone(),
                    messages: legacy.message.iter().cloned().collect(),
                }]
            }
        }
    }
}

impl NormalizedEvent {
    /// Messages in dispatcher form, in payload order.
    pub fn inbound_messages(&self) -> Vec<InboundMessage> {
        let fallback_user = self
            .user
            .as_ref()
            .and_then(|u| u.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        self.messages
            .iter()
            .map(|msg| InboundMessage {
                app_id: self.app_id.clone().unwrap_or_default(),
                conversation_id: self.conversation_id.clone(),
                user_id: msg
                    .author
                    .as_ref()
                    .and_then(|a| a.user_id.clone())
                    .or_else(|| fallback_user.clone()),
                message_id: msg.id.clone(),
                author_type: msg.author_type(),
                text: msg.text().to_string(),
            })
            .collect()
    }

    /// Messages in event-log form.
    pub fn new_messages(&self, webhook_log_id: Option<i64>) -> Vec<NewMessage> {
        self.messages
            .iter()
            .map(|msg| NewMessage {
                external_message_id: msg.id.clone(),
                author_type: msg.author_type().as_str().to_string(),
                author_id: msg.author.as_ref().and_then(|a| a.user_id.clone()),
                author_name: msg.author.as_ref().and_then(|a| a.display_name.clone()),
                content_type: msg
                    .content
                    .as_ref()
                    .and_then(|c| c.content_type.clone())
                    .unwrap_or_else(|| "text".to_string()),
                content_text: msg.content.as_ref().and_then(|c| c.text.clone()),
                content_payload: serde_json::to_value(msg).ok(),
                external_timestamp: msg.received_at(),
                webhook_log_id,
            })
            .collect()
    }
}
