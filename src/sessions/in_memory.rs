//! In-memory session store implementation.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{DialogueState, SessionStore};
use crate::context::ContextStore;

/// Dialogue states in a mutex-protected map.
///
/// Holds the context store so that `reset` can drop the session transcript
/// together with the state.
pub struct InMemorySessionStore {
    states: Mutex<HashMap<String, DialogueState>>,
    context: Arc<dyn ContextStore>,
}

impl InMemorySessionStore {
    pub fn new(context: Arc<dyn ContextStore>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            context,
        }
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Result<Option<DialogueState>> {
        Ok(self.states.lock().get(session_id).cloned())
    }

    async fn save(&self, session_id: &str, state: DialogueState) -> Result<()> {
        self.states.lock().insert(session_id.to_string(), state);
        Ok(())
    }

    async fn reset(&self, session_id: &str) -> Result<()> {
        self.context.clear(session_id).await?;
        self.states
            .lock()
            .insert(session_id.to_string(), DialogueState::default());
        Ok(())
    }

    async fn remove(&self, session_id: &str) -> Result<()> {
        self.context.clear(session_id).await?;
        self.states.lock().remove(session_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}
