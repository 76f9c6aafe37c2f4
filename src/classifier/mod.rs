//! Intent classification behind a fail-closed port.
//!
//! Backends implement [`IntentClassifier`]. The [`ClassifierPort`] wraps one
//! and enforces the input contract (validation, sanitization, PII masking,
//! fallback on error) so that callers never see a classification failure.
//!
//! [`create_classifier`] picks the remote [`HttpClassifier`] when an endpoint
//! is configured and the offline [`KeywordClassifier`] otherwise.

pub mod http;
pub mod keyword;
pub mod port;
pub mod traits;

pub use http::HttpClassifier;
pub use keyword::KeywordClassifier;
pub use port::{ClassifierPort, PortOutcome};
pub use traits::{Classification, ClassifierError, IntentClassifier, FALLBACK_INTENT};

use crate::config::ClassifierConfig;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Factory: create the classifier backend selected by config.
pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn IntentClassifier>> {
    match config.endpoint.as_deref().map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => Ok(Arc::new(HttpClassifier::new(
            endpoint,
            Duration::from_secs(config.timeout_secs),
            config.id2label.clone(),
        )?)),
        _ => Ok(Arc::new(KeywordClassifier::new())),
    }
}

/// Factory: create the fail-closed port around the configured backend.
pub fn create_classifier_port(config: &ClassifierConfig) -> Result<ClassifierPort> {
    Ok(ClassifierPort::new(
        create_classifier(config)?,
        config.max_query_chars,
    ))
}
