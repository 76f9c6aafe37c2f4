//! Session management: per-session dialogue state.

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemorySessionStore;
pub use traits::{DialogueState, SessionStore, TransferStage};

use crate::context::ContextStore;
use std::sync::Arc;

/// Create a default in-memory session store whose resets also clear `context`.
pub fn create_session_store(context: Arc<dyn ContextStore>) -> Arc<dyn SessionStore> {
    Arc::new(InMemorySessionStore::new(context))
}
