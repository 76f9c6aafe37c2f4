//! Context store: per-session transcript of user and bot turns.

pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryContextStore;
pub use sqlite::SqliteContextStore;
pub use traits::{ContextStore, Sender, TranscriptEntry};

use crate::config::{ContextBackend, ContextConfig};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Factory: create the context store selected by config.
///
/// `default_dir` is used for the SQLite file when `context.sqlite_path` is unset.
pub fn create_context_store(
    config: &ContextConfig,
    default_dir: &Path,
) -> Result<Arc<dyn ContextStore>> {
    match config.backend {
        ContextBackend::Memory => Ok(Arc::new(InMemoryContextStore::new())),
        ContextBackend::Sqlite => {
            let path = config
                .sqlite_path
                .clone()
                .unwrap_or_else(|| default_dir.join("context.db"));
            Ok(Arc::new(SqliteContextStore::open(&path)?))
        }
    }
}
