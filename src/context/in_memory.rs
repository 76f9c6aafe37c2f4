//! In-memory context store implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::traits::{ContextStore, Sender, TranscriptEntry};

/// Transcripts held in a mutex-protected map, one vector per session.
pub struct InMemoryContextStore {
    transcripts: Mutex<HashMap<String, Vec<TranscriptEntry>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self {
            transcripts: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContextStore {
    fn default() -> Self {
        Self::new()
    }
}

fn tail<T: Clone>(entries: &[T], limit: usize) -> Vec<T> {
    let start = entries.len().saturating_sub(limit);
    entries[start..].to_vec()
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn append(&self, session_id: &str, sender: Sender, text: &str) -> Result<()> {
        let mut transcripts = self.transcripts.lock();
        let entries = transcripts.entry(session_id.to_string()).or_default();
        let seq = entries.last().map_or(0, |e| e.seq + 1);
        entries.push(TranscriptEntry {
            session_id: session_id.to_string(),
            sender,
            text: text.to_string(),
            seq,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<String>> {
        let transcripts = self.transcripts.lock();
        let Some(entries) = transcripts.get(session_id) else {
            return Ok(Vec::new());
        };
        Ok(tail(entries, limit).into_iter().map(|e| e.text).collect())
    }

    async fn transcript(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TranscriptEntry>> {
        let transcripts = self.transcripts.lock();
        let entries = match transcripts.get(session_id) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };

        match limit {
            Some(n) => Ok(tail(entries, n)),
            None => Ok(entries.clone()),
        }
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        self.transcripts.lock().remove(session_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
