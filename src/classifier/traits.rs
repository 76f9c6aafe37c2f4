//! Intent classifier backend traits and types.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Intent label used whenever input is invalid or classification failed.
pub const FALLBACK_INTENT: &str = "fallback";

/// Top predicted intent and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_INTENT, 0.0)
    }

    pub fn is_fallback(&self) -> bool {
        self.label == FALLBACK_INTENT
    }
}

/// Errors raised by remote classifier backends.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("classifier returned status {0}")]
    Status(u16),
    #[error("classifier returned no predictions")]
    Empty,
}

/// A text-classification model that predicts a banking intent.
///
/// `context` carries the most recent transcript lines for the session, oldest
/// first. Backends are free to ignore it.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str, context: &[String]) -> Result<Classification>;
    fn name(&self) -> &str;
}
