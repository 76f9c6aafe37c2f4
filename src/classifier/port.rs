//! Fail-closed wrapper around an [`IntentClassifier`] backend.

use std::sync::Arc;

use super::traits::{Classification, IntentClassifier};
use crate::observability;
use crate::security::{self, InputRejection};

/// Result of running one utterance through the port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortOutcome {
    pub classification: Classification,
    /// Set when the utterance never reached the backend.
    pub rejection: Option<InputRejection>,
}

impl PortOutcome {
    fn rejected(rejection: InputRejection) -> Self {
        Self {
            classification: Classification::fallback(),
            rejection: Some(rejection),
        }
    }
}

/// Validates, sanitizes and masks around a classifier backend.
///
/// Never fails: invalid input and backend errors both come back as the
/// fallback intent at confidence 0.0.
pub struct ClassifierPort {
    backend: Arc<dyn IntentClassifier>,
    max_query_chars: usize,
}

impl ClassifierPort {
    pub fn new(backend: Arc<dyn IntentClassifier>, max_query_chars: usize) -> Self {
        Self {
            backend,
            max_query_chars,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn classify(&self, text: &str, context: &[String]) -> PortOutcome {
        if let Err(rejection) = security::validate_query(text, self.max_query_chars) {
            tracing::info!(reason = ?rejection, "query rejected before classification");
            observability::metrics().classifier_fallbacks.inc();
            return PortOutcome::rejected(rejection);
        }

        let sanitized = security::sanitize(text);
        if sanitized.trim().is_empty() {
            tracing::info!("query has no alphanumeric content");
            observability::metrics().classifier_fallbacks.inc();
            return PortOutcome {
                classification: Classification::fallback(),
                rejection: None,
            };
        }

        let classification = match self.backend.classify(&sanitized, context).await {
            Ok(raw) => normalize(raw),
            Err(error) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    error = %security::mask_sensitive(&error.to_string()),
                    "classification failed; using fallback"
                );
                observability::metrics().classifier_fallbacks.inc();
                Classification::fallback()
            }
        };

        tracing::debug!(
            query = %security::mask_sensitive(&sanitized),
            intent = %classification.label,
            confidence = classification.confidence,
            "classified"
        );

        PortOutcome {
            classification,
            rejection: None,
        }
    }
}

fn normalize(raw: Classification) -> Classification {
    let label = raw.label.trim();
    if label.is_empty() {
        return Classification::fallback();
    }
    let confidence = if raw.confidence.is_nan() {
        0.0
    } else {
        raw.confidence.clamp(0.0, 1.0)
    };
    Classification::new(security::mask_sensitive(label), confidence)
}
