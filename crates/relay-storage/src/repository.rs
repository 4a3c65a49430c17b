//! Repositories over the webhook event log.
//!
//! - `WebhookLogRepository`: raw deliveries and their processing outcome
//! - `ConversationRepository`: external conversations seen in payloads
//! - `MessageRepository`: messages extracted from payloads

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{OptionalExtension, Row};
use serde::Serialize;
use serde_json::Value;

use relay_core::error::RelayError;

use crate::db::Database;

fn millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

fn parse_json(text: Option<String>) -> Option<Value> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

fn storage_err(e: rusqlite::Error) -> RelayError {
    RelayError::Storage(e.to_string())
}

// =============================================================================
// Webhook logs
// =============================================================================

/// Processing state of a received webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Success,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Success => "success",
            ProcessingStatus::Error => "error",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "success" => Ok(ProcessingStatus::Success),
            "error" => Ok(ProcessingStatus::Error),
            other => Err(RelayError::Storage(format!(
                "Unknown processing status: {}",
                other
            ))),
        }
    }
}

/// A webhook delivery to record.
#[derive(Debug, Clone, Default)]
pub struct NewWebhookLog {
    pub source_ip: Option<String>,
    /// Request headers as a JSON object.
    pub headers: Value,
    /// Parsed body, when it was valid JSON.
    pub payload: Option<Value>,
    pub raw_body: String,
}

/// A recorded webhook delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookLog {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub headers: Value,
    pub payload: Option<Value>,
    pub raw_body: String,
    pub processing_status: ProcessingStatus,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// One page of webhook logs, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct LogPage {
    pub total: u64,
    pub logs: Vec<WebhookLog>,
}

/// Webhook log counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
}

const LOG_COLUMNS: &str = "id, received_at, source_ip, headers, payload, raw_body,
                           processing_status, error_message, processed_at";

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<WebhookLog> {
    let status: String = row.get(6)?;
    Ok(WebhookLog {
        id: row.get(0)?,
        received_at: from_millis(row.get(1)?),
        source_ip: row.get(2)?,
        headers: parse_json(row.get(3)?).unwrap_or(Value::Null),
        payload: parse_json(row.get(4)?),
        raw_body: row.get(5)?,
        processing_status: status.parse().unwrap_or(ProcessingStatus::Pending),
        error_message: row.get(7)?,
        processed_at: row.get::<_, Option<i64>>(8)?.map(from_millis),
    })
}

/// Repository for raw webhook deliveries.
pub struct WebhookLogRepository {
    db: Arc<Database>,
}

impl WebhookLogRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a delivery as `pending` and return its id.
    pub fn create_log(&self, log: &NewWebhookLog) -> Result<i64, RelayError> {
        let payload = log.payload.as_ref().map(Value::to_string);
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO webhook_raw_logs (received_at, source_ip, headers, payload, raw_body, processing_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending')",
                rusqlite::params![
                    millis(Utc::now()),
                    log.source_ip,
                    log.headers.to_string(),
                    payload,
                    log.raw_body,
                ],
            )
            .map_err(|e| RelayError::Storage(format!("Failed to save webhook log: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Set the final status of a delivery and stamp `processed_at`.
    pub fn update_status(
        &self,
        id: i64,
        status: ProcessingStatus,
        error_message: Option<&str>,
    ) -> Result<(), RelayError> {
        self.db.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE webhook_raw_logs
                     SET processing_status = ?1, error_message = ?2, processed_at = ?3
                     WHERE id = ?4",
                    rusqlite::params![status.as_str(), error_message, millis(Utc::now()), id],
                )
                .map_err(|e| {
                    RelayError::Storage(format!("Failed to update webhook log: {}", e))
                })?;
            if updated == 0 {
                return Err(RelayError::Storage(format!("Webhook log {} not found", id)));
            }
            Ok(())
        })
    }

    pub fn find_log(&self, id: i64) -> Result<Option<WebhookLog>, RelayError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM webhook_raw_logs WHERE id = ?1", LOG_COLUMNS),
                rusqlite::params![id],
                row_to_log,
            )
            .optional()
            .map_err(storage_err)
        })
    }

    /// Newest-first page of logs, optionally filtered by status.
    pub fn list_logs(
        &self,
        limit: u32,
        offset: u32,
        status: Option<ProcessingStatus>,
    ) -> Result<LogPage, RelayError> {
        let status = status.map(|s| s.as_str());
        self.db.with_conn(|conn| {
            let total: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM webhook_raw_logs
                     WHERE (?1 IS NULL OR processing_status = ?1)",
                    rusqlite::params![status],
                    |row| row.get(0),
                )
                .map_err(storage_err)?;

            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM webhook_raw_logs
                     WHERE (?1 IS NULL OR processing_status = ?1)
                     ORDER BY id DESC
                     LIMIT ?2 OFFSET ?3",
                    LOG_COLUMNS
                ))
                .map_err(storage_err)?;
            let logs = stmt
                .query_map(rusqlite::params![status, limit, offset], row_to_log)
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?;

            Ok(LogPage {
                total: total as u64,
                logs,
            })
        })
    }

    pub fn log_stats(&self) -> Result<LogStats, RelayError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT processing_status, COUNT(*) FROM webhook_raw_logs
                     GROUP BY processing_status",
                )
                .map_err(storage_err)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(storage_err)?;

            let mut stats = LogStats::default();
            for row in rows {
                let (status, count) = row.map_err(storage_err)?;
                stats.total += count as u64;
                stats.by_status.insert(status, count as u64);
            }
            Ok(stats)
        })
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// An external conversation seen in webhook payloads.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub external_conversation_id: String,
    pub external_app_id: Option<String>,
    pub user_id: Option<String>,
    pub user_external_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Option<Value>,
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<ConversationRecord> {
    Ok(ConversationRecord {
        id: row.get(0)?,
        external_conversation_id: row.get(1)?,
        external_app_id: row.get(2)?,
        user_id: row.get(3)?,
        user_external_id: row.get(4)?,
        status: row.get(5)?,
        created_at: from_millis(row.get(6)?),
        updated_at: from_millis(row.get(7)?),
        metadata: parse_json(row.get(8)?),
    })
}

/// One page of conversations, most recently updated first.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPage {
    pub total: u64,
    pub conversations: Vec<ConversationRecord>,
}

const CONVERSATION_COLUMNS: &str = "id, external_conversation_id, external_app_id, user_id,
                                    user_external_id, status, created_at, updated_at, metadata_json";

/// Repository for external conversations.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Upsert by external id.
    ///
    /// `user` is the platform's user object; its `id` and `externalId`
    /// fill the user columns and the whole object is kept as metadata.
    /// Known values are never overwritten with missing ones.
    pub fn get_or_create_conversation(
        &self,
        external_conversation_id: &str,
        external_app_id: Option<&str>,
        user: Option<&Value>,
    ) -> Result<ConversationRecord, RelayError> {
        let user_id = user.and_then(|u| u.get("id")).and_then(Value::as_str);
        let user_external_id = user.and_then(|u| u.get("externalId")).and_then(Value::as_str);
        let metadata = user.map(Value::to_string);
        let now = millis(Utc::now());

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations
                    (external_conversation_id, external_app_id, user_id, user_external_id,
                     created_at, updated_at, metadata_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)
                 ON CONFLICT(external_conversation_id) DO UPDATE SET
                    external_app_id = COALESCE(excluded.external_app_id, conversations.external_app_id),
                    user_id = COALESCE(excluded.user_id, conversations.user_id),
                    user_external_id = COALESCE(excluded.user_external_id, conversations.user_external_id),
                    metadata_json = COALESCE(excluded.metadata_json, conversations.metadata_json),
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    external_conversation_id,
                    external_app_id,
                    user_id,
                    user_external_id,
                    now,
                    metadata,
                ],
            )
            .map_err(|e| RelayError::Storage(format!("Failed to save conversation: {}", e)))?;

            conn.query_row(
                &format!(
                    "SELECT {} FROM conversations WHERE external_conversation_id = ?1",
                    CONVERSATION_COLUMNS
                ),
                rusqlite::params![external_conversation_id],
                row_to_conversation,
            )
            .map_err(storage_err)
        })
    }

    pub fn find_conversation(
        &self,
        external_conversation_id: &str,
    ) -> Result<Option<ConversationRecord>, RelayError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM conversations WHERE external_conversation_id = ?1",
                    CONVERSATION_COLUMNS
                ),
                rusqlite::params![external_conversation_id],
                row_to_conversation,
            )
            .optional()
            .map_err(storage_err)
        })
    }

    pub fn list_conversations(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<ConversationPage, RelayError> {
        self.db.with_conn(|conn| {
            let total: i64 = conn
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
                .map_err(storage_err)?;

            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM conversations
                     ORDER BY updated_at DESC, id DESC
                     LIMIT ?1 OFFSET ?2",
                    CONVERSATION_COLUMNS
                ))
                .map_err(storage_err)?;
            let conversations = stmt
                .query_map(rusqlite::params![limit, offset], row_to_conversation)
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?;

            Ok(ConversationPage {
                total: total as u64,
                conversations,
            })
        })
    }
}

// =============================================================================
// Messages
// =============================================================================

/// A message extracted from a webhook payload.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub external_message_id: Option<String>,
    pub author_type: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub content_type: String,
    pub content_text: Option<String>,
    /// The full message object as received.
    pub content_payload: Option<Value>,
    pub external_timestamp: Option<DateTime<Utc>>,
    pub webhook_log_id: Option<i64>,
}

/// A stored message.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRecord {
    pub id: i64,
    pub conversation_id: i64,
    pub external_message_id: Option<String>,
    pub author_type: String,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    pub content_type: String,
    pub content_text: Option<String>,
    pub content_payload: Option<Value>,
    pub received_at: DateTime<Utc>,
    pub external_timestamp: Option<DateTime<Utc>>,
    pub webhook_log_id: Option<i64>,
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        external_message_id: row.get(2)?,
        author_type: row.get(3)?,
        author_id: row.get(4)?,
        author_name: row.get(5)?,
        content_type: row.get(6)?,
        content_text: row.get(7)?,
        content_payload: parse_json(row.get(8)?),
        received_at: from_millis(row.get(9)?),
        external_timestamp: row.get::<_, Option<i64>>(10)?.map(from_millis),
        webhook_log_id: row.get(11)?,
    })
}

/// Repository for extracted messages.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a message under the internal conversation id. Returns its id.
    pub fn save_message(&self, conversation_id: i64, msg: &NewMessage) -> Result<i64, RelayError> {
        let content_type = if msg.content_type.is_empty() {
            "text"
        } else {
            msg.content_type.as_str()
        };
        let payload = msg.content_payload.as_ref().map(Value::to_string);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages
                    (conversation_id, external_message_id, author_type, author_id, author_name,
                     content_type, content_text, content_payload, received_at,
                     external_timestamp, webhook_log_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    conversation_id,
                    msg.external_message_id,
                    msg.author_type,
                    msg.author_id,
                    msg.author_name,
                    content_type,
                    msg.content_text,
                    payload,
                    millis(Utc::now()),
                    msg.external_timestamp.map(millis),
                    msg.webhook_log_id,
                ],
            )
            .map_err(|e| RelayError::Storage(format!("Failed to save message: {}", e)))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Messages of a conversation in arrival order.
    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<MessageRecord>, RelayError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, conversation_id, external_message_id, author_type, author_id,
                            author_name, content_type, content_text, content_payload,
                            received_at, external_timestamp, webhook_log_id
                     FROM messages WHERE conversation_id = ?1
                     ORDER BY id ASC",
                )
                .map_err(storage_err)?;
            let messages = stmt
                .query_map(rusqlite::params![conversation_id], row_to_message)
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?;
            Ok(messages)
        })
    }
}
