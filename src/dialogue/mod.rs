//! Dialogue layer: the per-session manager and the transfer slot-filling flow.
//!
//! [`DialogueManager::process_turn`] is the single entry point. For every
//! utterance it decides whether to cancel, switch, continue the active flow,
//! route a new intent, or ask the caller to rephrase, and records both sides
//! of the exchange in the context store.

pub mod manager;
pub mod replies;
pub mod transfer;

#[cfg(test)]
mod proptests;

pub use manager::{Decision, DialogueManager, TurnResult};
pub use transfer::{TransferLimits, TransferStep};

use crate::classifier::create_classifier_port;
use crate::config::Config;
use crate::context::create_context_store;
use crate::sessions::create_session_store;
use crate::tools::default_tools;
use anyhow::Result;
use rust_decimal::Decimal;
use std::time::Duration;

/// Tunables for [`DialogueManager`].
#[derive(Debug, Clone)]
pub struct DialogueSettings {
    pub routing_threshold: f64,
    pub switch_threshold: f64,
    pub limits: TransferLimits,
    /// Transcript lines handed to the classifier as context.
    pub recent_limit: usize,
    pub tool_timeout: Duration,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            routing_threshold: 0.5,
            switch_threshold: 0.8,
            limits: TransferLimits::default(),
            recent_limit: 5,
            tool_timeout: Duration::from_secs(10),
        }
    }
}

impl DialogueSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            routing_threshold: config.dialogue.routing_threshold,
            switch_threshold: config.dialogue.switch_threshold,
            limits: TransferLimits {
                max_amount: Decimal::from(config.dialogue.max_transfer_amount),
                currency_symbol: config.dialogue.currency_symbol.clone(),
            },
            recent_limit: config.context.recent_limit,
            tool_timeout: Duration::from_secs(config.tools.timeout_secs),
        }
    }
}

/// Factory: wire classifier, stores and tools from config into a manager.
pub fn create_dialogue_manager(config: &Config) -> Result<DialogueManager> {
    let port = create_classifier_port(&config.classifier)?;
    let context = create_context_store(&config.context, &config.data_dir())?;
    let sessions = create_session_store(context.clone());
    let tools = default_tools(&config.tools)?;

    tracing::info!(
        classifier = port.backend_name(),
        context = context.name(),
        sessions = sessions.name(),
        tools = ?tools.names(),
        "dialogue manager ready"
    );

    Ok(DialogueManager::new(
        port,
        sessions,
        context,
        tools,
        DialogueSettings::from_config(config),
    ))
}

/// Lowercase `text` and strip surrounding punctuation and whitespace, for
/// matching single-word commands like `yes` or `cancel`.
pub(crate) fn normalized_token(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tokens_normalize() {
        assert_eq!(normalized_token("  Yes! "), "yes");
        assert_eq!(normalized_token("STOP."), "stop");
        assert_eq!(normalized_token("never mind"), "never mind");
        assert_eq!(normalized_token("..."), "");
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.dialogue.max_transfer_amount = 750;
        config.dialogue.currency_symbol = "₹".into();
        config.tools.timeout_secs = 3;

        let settings = DialogueSettings::from_config(&config);
        assert_eq!(settings.limits.max_amount, Decimal::from(750));
        assert_eq!(settings.limits.currency_symbol, "₹");
        assert_eq!(settings.tool_timeout, Duration::from_secs(3));
        assert_eq!(settings.recent_limit, 5);
    }

    #[tokio::test]
    async fn factory_builds_offline_manager() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.config_path = tmp.path().join("config.toml");

        let manager = create_dialogue_manager(&config).unwrap();
        assert_eq!(manager.classifier_name(), "keyword");
        assert!(manager.tools().contains("transfer"));

        let result = manager.process_turn("s1", "transfer money").await;
        assert_eq!(result.intent, "transfer");
        assert_eq!(result.response, transfer::START_PROMPT);
    }
}
