//! Durable session and message storage over SQLite.
//!
//! The store is the canonical record of a conversation; the in-process
//! session cache in `codeloom-agent` is a performance layer on top of it.
//! Append order equals retrieval order, session deletion cascades to
//! messages in one transaction, and token increments are atomic.

use chrono::Utc;
use codeloom_core::{ChatMessage, MessageContent, Role, SessionStatus};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {field}: {value}")]
    InvalidColumn { field: &'static str, value: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A persisted session row.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub status: SessionStatus,
    pub working_dir: String,
    pub title: Option<String>,
    pub total_tokens: u64,
    pub current_plan: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A session row as listed by `list_sessions`, with derived fields.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub status: SessionStatus,
    pub working_dir: String,
    pub title: Option<String>,
    pub preview: Option<String>,
    pub total_tokens: u64,
    pub message_count: u64,
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted message with its sequence number.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub seq: i64,
    pub role: Role,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub created_at: String,
}

impl StoredMessage {
    pub fn into_chat_message(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content,
            tool_call_id: self.tool_call_id,
        }
    }
}

/// Truncate the first user message into a listing preview.
pub fn preview_of(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS sessions (
                 id            TEXT PRIMARY KEY,
                 status        TEXT NOT NULL,
                 working_dir   TEXT NOT NULL,
                 title         TEXT,
                 total_tokens  INTEGER NOT NULL DEFAULT 0,
                 current_plan  TEXT,
                 created_at    TEXT NOT NULL,
                 updated_at    TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS messages (
                 id            INTEGER PRIMARY KEY AUTOINCREMENT,
                 session_id    TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                 role          TEXT NOT NULL,
                 content       TEXT,
                 tool_call_id  TEXT,
                 tool_calls    TEXT,
                 created_at    TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_messages_session ON messages(session_id);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ── Sessions ───────────────────────────────────────────────────────

    pub fn create_session(
        &self,
        id: &str,
        working_dir: &str,
        status: SessionStatus,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "INSERT INTO sessions (id, status, working_dir, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, status.as_str(), working_dir, now],
        )?;
        tracing::debug!(session = id, "session created");
        Ok(())
    }

    pub fn get_session(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, status, working_dir, title, total_tokens, current_plan,
                    created_at, updated_at
             FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                ))
            },
        )
        .optional()?
        .map(
            |(id, status, working_dir, title, tokens, plan, created, updated)| {
                let status =
                    SessionStatus::parse(&status).ok_or_else(|| StoreError::InvalidColumn {
                        field: "status",
                        value: status.clone(),
                    })?;
                Ok(SessionRecord {
                    id,
                    status,
                    working_dir,
                    title,
                    total_tokens: tokens.max(0) as u64,
                    current_plan: plan,
                    created_at: created,
                    updated_at: updated,
                })
            },
        )
        .transpose()
    }

    pub fn update_session_status(&self, id: &str, status: SessionStatus) -> StoreResult<()> {
        self.touch(id, "status", status.as_str())
    }

    pub fn update_session_working_dir(&self, id: &str, dir: &str) -> StoreResult<()> {
        self.touch(id, "working_dir", dir)
    }

    pub fn update_session_title(&self, id: &str, title: &str) -> StoreResult<()> {
        self.touch(id, "title", title)
    }

    pub fn update_session_plan(&self, id: &str, plan: Option<&str>) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "UPDATE sessions SET current_plan = ?1, updated_at = ?2 WHERE id = ?3",
            params![plan, now, id],
        )?;
        Ok(())
    }

    fn touch(&self, id: &str, column: &str, value: &str) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        let sql = format!("UPDATE sessions SET {column} = ?1, updated_at = ?2 WHERE id = ?3");
        self.conn.lock().execute(&sql, params![value, now, id])?;
        Ok(())
    }

    pub fn increment_session_tokens(&self, id: &str, delta: u64) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.lock().execute(
            "UPDATE sessions SET total_tokens = total_tokens + ?1, updated_at = ?2 WHERE id = ?3",
            params![delta as i64, now, id],
        )?;
        Ok(())
    }

    /// Delete a session and all of its messages in one transaction.
    pub fn delete_session(&self, id: &str) -> StoreResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM messages WHERE session_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    pub fn list_sessions(
        &self,
        limit: u64,
        offset: u64,
    ) -> StoreResult<(Vec<SessionSummary>, u64)> {
        let conn = self.conn.lock();
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(
            "SELECT s.id, s.status, s.working_dir, s.title, s.total_tokens,
                    s.created_at, s.updated_at,
                    (SELECT COUNT(*) FROM messages m WHERE m.session_id = s.id),
                    (SELECT m.content FROM messages m
                      WHERE m.session_id = s.id AND m.role = 'user'
                      ORDER BY m.id ASC LIMIT 1)
             FROM sessions s
             ORDER BY s.created_at DESC, s.id DESC
             LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![limit as i64, offset as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, status, working_dir, title, tokens, created, updated, count, first) = row?;
            let status =
                SessionStatus::parse(&status).ok_or_else(|| StoreError::InvalidColumn {
                    field: "status",
                    value: status.clone(),
                })?;
            let preview = first
                .as_deref()
                .map(decode_content)
                .map(|c| preview_of(&c.text()));
            sessions.push(SessionSummary {
                id,
                status,
                working_dir,
                title,
                preview,
                total_tokens: tokens.max(0) as u64,
                message_count: count.max(0) as u64,
                created_at: created,
                updated_at: updated,
            });
        }
        Ok((sessions, total.max(0) as u64))
    }

    // ── Messages ───────────────────────────────────────────────────────

    /// Append a message; returns its sequence number within the session.
    pub fn append_message(&self, session_id: &str, message: &ChatMessage) -> StoreResult<i64> {
        let now = Utc::now().to_rfc3339();
        let content = encode_content(&message.content)?;
        let tool_calls = encode_tool_calls(message);

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (session_id, role, content, tool_call_id, tool_calls, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                message.role.as_str(),
                content,
                message.tool_call_id,
                tool_calls,
                now
            ],
        )?;
        let seq = conn.last_insert_rowid();
        conn.execute(
            "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
            params![now, session_id],
        )?;
        Ok(seq)
    }

    /// All messages for a session, ordered by sequence number ascending.
    pub fn list_messages(&self, session_id: &str) -> StoreResult<Vec<StoredMessage>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, role, content, tool_call_id, tool_calls, created_at
             FROM messages WHERE session_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (seq, role, content, tool_call_id, tool_calls, created_at) = row?;
            let role = Role::parse(&role).ok_or_else(|| StoreError::InvalidColumn {
                field: "role",
                value: role.clone(),
            })?;
            let content = content.as_deref().map(decode_content).unwrap_or_else(|| {
                MessageContent::Text(String::new())
            });
            let tool_calls = tool_calls
                .as_deref()
                .and_then(|t| serde_json::from_str(t).ok());
            messages.push(StoredMessage {
                seq,
                role,
                content,
                tool_calls,
                tool_call_id,
                created_at,
            });
        }
        Ok(messages)
    }

    pub fn count_messages(&self, session_id: &str) -> StoreResult<u64> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id],
            |r| r.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    pub fn first_user_message(&self, session_id: &str) -> StoreResult<Option<String>> {
        let content: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT content FROM messages
                 WHERE session_id = ?1 AND role = 'user'
                 ORDER BY id ASC LIMIT 1",
                params![session_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(content.map(|c| decode_content(&c).text()))
    }
}

// ── Content column encoding ────────────────────────────────────────────
//
// The content column holds the JSON encoding of `MessageContent`: a JSON
// string for plain text, a JSON array for block sequences. Both decode back
// losslessly through the untagged union.

fn encode_content(content: &MessageContent) -> StoreResult<String> {
    Ok(serde_json::to_string(content)?)
}

fn decode_content(raw: &str) -> MessageContent {
    serde_json::from_str(raw).unwrap_or_else(|_| MessageContent::Text(raw.to_string()))
}

/// Assistant tool calls, stored in the wire shape
/// `[{id, type: "function", function: {name, arguments}}]`.
fn encode_tool_calls(message: &ChatMessage) -> Option<String> {
    let calls = message.tool_calls();
    if calls.is_empty() {
        return None;
    }
    let wire: Vec<_> = calls
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "type": "function",
                "function": { "name": c.name, "arguments": c.arguments },
            })
        })
        .collect();
    serde_json::to_string(&wire).ok()
}
