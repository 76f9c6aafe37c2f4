//! SQLite-backed context store, for transcripts that survive restarts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

use super::traits::{ContextStore, Sender, TranscriptEntry};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS transcript (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL,
    sender      TEXT NOT NULL,
    text        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transcript_session ON transcript(session_id, id);
";

pub struct SqliteContextStore {
    conn: Mutex<Connection>,
}

impl SqliteContextStore {
    /// Open (or create) the transcript database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create context directory: {}", parent.display())
            })?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open context database: {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize transcript schema")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_entries(
        conn: &Connection,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TranscriptEntry>> {
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = conn.prepare(
            "SELECT id, sender, text, created_at FROM (
                 SELECT id, sender, text, created_at FROM transcript
                 WHERE session_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![session_id, limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, sender, text, created_at) = row?;
            let sender = Sender::parse(&sender)
                .with_context(|| format!("Unknown transcript sender: {sender}"))?;
            let timestamp = DateTime::parse_from_rfc3339(&created_at)
                .with_context(|| format!("Invalid transcript timestamp: {created_at}"))?
                .with_timezone(&Utc);
            entries.push(TranscriptEntry {
                session_id: session_id.to_string(),
                sender,
                text,
                seq: u64::try_from(id).unwrap_or_default(),
                timestamp,
            });
        }
        Ok(entries)
    }
}

#[async_trait]
impl ContextStore for SqliteContextStore {
    async fn append(&self, session_id: &str, sender: Sender, text: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO transcript (session_id, sender, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, sender.as_str(), text, Utc::now().to_rfc3339()],
        )
        .context("Failed to append transcript entry")?;
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let entries = Self::query_entries(&conn, session_id, Some(limit))?;
        Ok(entries.into_iter().map(|e| e.text).collect())
    }

    async fn transcript(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TranscriptEntry>> {
        let conn = self.conn.lock();
        Self::query_entries(&conn, session_id, limit)
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM transcript WHERE session_id = ?1",
            params![session_id],
        )
        .context("Failed to clear transcript")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
