//! Session storage traits and the per-session dialogue state record.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The slot the transfer flow is waiting on.
///
/// Variants are declared in flow order, so `Ord` follows the flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransferStage {
    Source,
    Destination,
    Amount,
    Confirm,
}

impl TransferStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
            Self::Amount => "amount",
            Self::Confirm => "confirm",
        }
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable dialogue state for one session.
///
/// `stage` is only ever set together with `active_intent`, and `amount` is only
/// set once the flow has reached [`TransferStage::Confirm`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogueState {
    pub active_intent: Option<String>,
    pub stage: Option<TransferStage>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub amount: Option<Decimal>,
    pub confirmed: bool,
}

impl DialogueState {
    /// State for a freshly routed intent with no slot-filling in progress.
    pub fn with_intent(intent: &str) -> Self {
        Self {
            active_intent: Some(intent.to_string()),
            ..Self::default()
        }
    }

    /// True while a multi-turn flow is waiting for input.
    pub fn has_active_flow(&self) -> bool {
        self.active_intent.is_some() && self.stage.is_some()
    }
}

/// Session-keyed store of [`DialogueState`] records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the state for a session, if one exists.
    async fn get(&self, session_id: &str) -> Result<Option<DialogueState>>;

    /// Replace the state for a session.
    async fn save(&self, session_id: &str, state: DialogueState) -> Result<()>;

    /// Clear the session's transcript, then install an empty state. Idempotent.
    async fn reset(&self, session_id: &str) -> Result<()>;

    /// Clear the session's transcript and forget its state entirely. The next
    /// turn recreates it lazily. Idempotent.
    async fn remove(&self, session_id: &str) -> Result<()>;

    /// The name of this session store implementation.
    fn name(&self) -> &str;
}
