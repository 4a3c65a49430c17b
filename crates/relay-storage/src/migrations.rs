//! Database schema migrations.
//!
//! Version 1 creates the webhook log, conversation and message tables.
//! Timestamps are stored as Unix milliseconds.

use rusqlite::Connection;
use tracing::info;

use relay_core::error::RelayError;

/// Run all pending migrations. Idempotent.
pub fn run_migrations(conn: &Connection) -> Result<(), RelayError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| RelayError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| RelayError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: webhook_event_log");
    }

    Ok(())
}

fn apply_v1(conn: &Connection) -> Result<(), RelayError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS webhook_raw_logs (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            received_at         INTEGER NOT NULL,
            source_ip           TEXT,
            headers             TEXT NOT NULL DEFAULT '{}',
            payload             TEXT,
            raw_body            TEXT NOT NULL DEFAULT '',
            processing_status   TEXT NOT NULL DEFAULT 'pending'
                                CHECK (processing_status IN ('pending', 'success', 'error')),
            error_message       TEXT,
            processed_at        INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_webhook_raw_logs_status
            ON webhook_raw_logs (processing_status, id DESC);

        CREATE TABLE IF NOT EXISTS conversations (
            id                          INTEGER PRIMARY KEY AUTOINCREMENT,
            external_conversation_id    TEXT NOT NULL UNIQUE,
            external_app_id             TEXT,
            user_id                     TEXT,
            user_external_id            TEXT,
            status                      TEXT NOT NULL DEFAULT 'active',
            created_at                  INTEGER NOT NULL,
            updated_at                  INTEGER NOT NULL,
            metadata_json               TEXT
        );

        CREATE TABLE IF NOT EXISTS messages (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id         INTEGER NOT NULL,
            external_message_id     TEXT,
            author_type             TEXT NOT NULL,
            author_id               TEXT,
            author_name             TEXT,
            content_type            TEXT NOT NULL DEFAULT 'text',
            content_text            TEXT,
            content_payload         TEXT,
            received_at             INTEGER NOT NULL,
            external_timestamp      INTEGER,
            webhook_log_id          INTEGER,
            FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
            FOREIGN KEY (webhook_log_id) REFERENCES webhook_raw_logs(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages (conversation_id, id ASC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'webhook_event_log');
        ",
    )
    .map_err(|e| RelayError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
