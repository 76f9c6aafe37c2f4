//! Transcript storage traits and types.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line of a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub session_id: String,
    pub sender: Sender,
    pub text: String,
    /// Monotonic within a session; orders entries by insertion.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
}

/// Per-session append-only transcript.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Append a line to the session transcript.
    async fn append(&self, session_id: &str, sender: Sender, text: &str) -> Result<()>;

    /// Text of the most recent `limit` entries, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<String>>;

    /// Full entries for a session, optionally limited to the most recent `limit`.
    async fn transcript(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TranscriptEntry>>;

    /// Drop every entry for a session.
    async fn clear(&self, session_id: &str) -> Result<()>;

    /// The name of this context store implementation.
    fn name(&self) -> &str;
}
