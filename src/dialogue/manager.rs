//! Per-turn orchestration of classification, session state and tools.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::replies::{acknowledgement, canned_reply};
use super::transfer::{self, TransferStep, START_PROMPT, TRANSFER_INTENT};
use super::{normalized_token, DialogueSettings};
use crate::classifier::{ClassifierPort, PortOutcome};
use crate::context::{ContextStore, Sender, TranscriptEntry};
use crate::observability;
use crate::security::mask_sensitive;
use crate::sessions::{DialogueState, SessionStore};
use crate::tools::{ToolError, ToolRegistry};

/// Utterances that abandon the active flow.
const CANCEL_TOKENS: &[&str] = &["cancel", "nevermind", "stop"];

/// Intent reported for a mid-flow cancellation.
pub const CANCEL_INTENT: &str = "cancel";

pub const LOW_CONFIDENCE_REPLY: &str = "Low confidence. Please rephrase your query.";

const TOOL_ERROR_PREFIX: &str = "Error while handling your request:";
const TOOL_UNAVAILABLE: &str = "The service is currently unavailable.";

/// What a turn did with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Active flow abandoned via a cancel token.
    Cancel,
    /// Active flow replaced by a confidently classified new intent.
    Switch,
    /// Utterance fed to the active flow.
    Continue,
    /// Flow confirmed and the tool ran.
    Complete,
    /// Flow declined at the confirmation step.
    Declined,
    /// New intent routed with no flow active.
    NewIntent,
    /// Classification too weak to act on.
    LowConfidence,
    /// Input refused before classification.
    Rejected,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Switch => "switch",
            Self::Continue => "continue",
            Self::Complete => "complete",
            Self::Declined => "declined",
            Self::NewIntent => "new_intent",
            Self::LowConfidence => "low_confidence",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal turns drop the session once the turn is recorded.
    fn is_terminal(self) -> bool {
        matches!(self, Self::Cancel | Self::Complete | Self::Declined)
    }
}

/// Reply to one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub intent: String,
    pub confidence: f64,
    pub response: String,
}

impl TurnResult {
    pub fn new(intent: impl Into<String>, confidence: f64, response: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            confidence,
            response: response.into(),
        }
    }

    fn masked(self) -> Self {
        Self {
            intent: mask_sensitive(&self.intent),
            confidence: self.confidence,
            response: mask_sensitive(&self.response),
        }
    }
}

struct Turn {
    decision: Decision,
    result: TurnResult,
}

impl Turn {
    fn new(decision: Decision, result: TurnResult) -> Self {
        Self { decision, result }
    }
}

/// Owns per-session dialogue state and turns utterances into replies.
///
/// Turns for the same session are serialized; different sessions proceed in
/// parallel.
pub struct DialogueManager {
    port: ClassifierPort,
    sessions: Arc<dyn SessionStore>,
    context: Arc<dyn ContextStore>,
    tools: ToolRegistry,
    settings: DialogueSettings,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DialogueManager {
    pub fn new(
        port: ClassifierPort,
        sessions: Arc<dyn SessionStore>,
        context: Arc<dyn ContextStore>,
        tools: ToolRegistry,
        settings: DialogueSettings,
    ) -> Self {
        Self {
            port,
            sessions,
            context,
            tools,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &DialogueSettings {
        &self.settings
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn classifier_name(&self) -> &str {
        self.port.backend_name()
    }

    /// Process one utterance. Never fails; the response is never empty.
    pub async fn process_turn(&self, session_id: &str, query: &str) -> TurnResult {
        let lock = self.session_lock(session_id);
        let turn = {
            let _guard = lock.lock().await;
            let turn = self.run_turn(session_id, query).await;
            let result = turn.result.masked();

            self.record(session_id, Sender::User, &mask_sensitive(query))
                .await;
            self.record(session_id, Sender::Bot, &result.response).await;
            if turn.decision.is_terminal() {
                self.remove(session_id).await;
            }
            Turn::new(turn.decision, result)
        };
        drop(lock);
        self.release_lock(session_id);

        observability::log_turn(
            session_id,
            query,
            &turn.result.intent,
            turn.result.confidence,
            &turn.result.response,
            turn.decision.as_str(),
        );
        turn.result
    }

    /// Drop a session's state and transcript.
    pub async fn reset_session(&self, session_id: &str) {
        let lock = self.session_lock(session_id);
        {
            let _guard = lock.lock().await;
            self.remove(session_id).await;
        }
        drop(lock);
        self.release_lock(session_id);
    }

    pub async fn session_state(&self, session_id: &str) -> anyhow::Result<Option<DialogueState>> {
        self.sessions.get(session_id).await
    }

    pub async fn transcript(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<TranscriptEntry>> {
        self.context.transcript(session_id, limit).await
    }

    async fn run_turn(&self, session_id: &str, query: &str) -> Turn {
        let state = self.load(session_id).await;
        let context = self.recent_context(session_id).await;
        let PortOutcome {
            classification,
            rejection,
        } = self.port.classify(query, &context).await;
        let routable = !classification.is_fallback();
        let (intent, confidence) = (classification.label, classification.confidence);

        if state.has_active_flow() {
            let active = state.active_intent.clone().unwrap_or_default();
            // Refused input is never slot data; the flow waits where it is.
            if let Some(rejection) = rejection {
                tracing::info!(session_id, active = %active, "rejected input during flow");
                return Turn::new(
                    Decision::Rejected,
                    TurnResult::new(intent, confidence, rejection.message()),
                );
            }
            if is_cancel(query) {
                let response = format!("{} cancelled.", capitalize(&active));
                return Turn::new(
                    Decision::Cancel,
                    TurnResult::new(CANCEL_INTENT, 1.0, response),
                );
            }

            if routable && intent != active && confidence >= self.settings.switch_threshold {
                tracing::info!(session_id, from = %active, to = %intent, "switching intent");
                self.reset(session_id).await;
                let response = self.route_new_intent(session_id, &intent, query).await;
                return Turn::new(
                    Decision::Switch,
                    TurnResult::new(intent, confidence, response),
                );
            }

            return self.continue_flow(session_id, &state, active, query).await;
        }

        if routable && confidence >= self.settings.routing_threshold {
            self.reset(session_id).await;
            let response = self.route_new_intent(session_id, &intent, query).await;
            return Turn::new(
                Decision::NewIntent,
                TurnResult::new(intent, confidence, response),
            );
        }

        match rejection {
            Some(rejection) => Turn::new(
                Decision::Rejected,
                TurnResult::new(intent, confidence, rejection.message()),
            ),
            None => Turn::new(
                Decision::LowConfidence,
                TurnResult::new(intent, confidence, LOW_CONFIDENCE_REPLY),
            ),
        }
    }

    async fn continue_flow(
        &self,
        session_id: &str,
        state: &DialogueState,
        active: String,
        query: &str,
    ) -> Turn {
        match transfer::transition(state, query, &self.settings.limits) {
            TransferStep::Prompt { state, response } => {
                self.save(session_id, state).await;
                Turn::new(Decision::Continue, TurnResult::new(active, 1.0, response))
            }
            TransferStep::Execute { state, summary } => {
                self.save(session_id, state).await;
                let response = self.invoke_tool(TRANSFER_INTENT, &summary).await;
                Turn::new(Decision::Complete, TurnResult::new(active, 1.0, response))
            }
            TransferStep::Cancelled { response } => {
                Turn::new(Decision::Declined, TurnResult::new(active, 1.0, response))
            }
        }
    }

    /// Install `intent` as the session's active intent and produce its reply.
    async fn route_new_intent(&self, session_id: &str, intent: &str, query: &str) -> String {
        if intent == TRANSFER_INTENT {
            self.save(session_id, transfer::entry_state()).await;
            return START_PROMPT.to_string();
        }

        self.save(session_id, DialogueState::with_intent(intent))
            .await;
        if self.tools.contains(intent) {
            return self.invoke_tool(intent, query).await;
        }
        canned_reply(intent).map_or_else(|| acknowledgement(intent), str::to_string)
    }

    async fn invoke_tool(&self, name: &str, input: &str) -> String {
        let outcome = self
            .tools
            .invoke(name, input, self.settings.tool_timeout)
            .await;
        let label = match &outcome {
            Ok(_) => "ok",
            Err(ToolError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        observability::metrics()
            .tool_calls
            .with_label_values(&[name, label])
            .inc();

        match outcome {
            Ok(reply) if reply.trim().is_empty() => acknowledgement(name),
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    tool = name,
                    error = %mask_sensitive(&error.to_string()),
                    "tool invocation failed"
                );
                let detail = self
                    .tools
                    .get(name)
                    .map_or_else(|| TOOL_UNAVAILABLE.to_string(), |t| {
                        t.failure_message().to_string()
                    });
                format!("{TOOL_ERROR_PREFIX} {detail}")
            }
        }
    }

    async fn load(&self, session_id: &str) -> DialogueState {
        match self.sessions.get(session_id).await {
            Ok(Some(state)) => return state,
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(session_id, %error, "session lookup failed; starting fresh");
                return DialogueState::default();
            }
        }
        self.reset(session_id).await;
        match self.sessions.get(session_id).await {
            Ok(state) => state.unwrap_or_default(),
            Err(error) => {
                tracing::warn!(session_id, %error, "session lookup failed after reset");
                DialogueState::default()
            }
        }
    }

    async fn recent_context(&self, session_id: &str) -> Vec<String> {
        self.context
            .recent(session_id, self.settings.recent_limit)
            .await
            .unwrap_or_else(|error| {
                tracing::warn!(session_id, %error, "could not read recent context");
                Vec::new()
            })
    }

    async fn save(&self, session_id: &str, state: DialogueState) {
        if let Err(error) = self.sessions.save(session_id, state).await {
            tracing::warn!(session_id, %error, "failed to save session state");
        }
    }

    async fn reset(&self, session_id: &str) {
        if let Err(error) = self.sessions.reset(session_id).await {
            tracing::warn!(session_id, %error, "failed to reset session");
        }
    }

    async fn remove(&self, session_id: &str) {
        if let Err(error) = self.sessions.remove(session_id).await {
            tracing::warn!(session_id, %error, "failed to drop session");
        }
    }

    async fn record(&self, session_id: &str, sender: Sender, text: &str) {
        if let Err(error) = self.context.append(session_id, sender, text).await {
            tracing::warn!(session_id, %sender, %error, "failed to append transcript");
        }
    }

    fn session_lock(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Forget the session's lock once no turn holds or awaits it.
    fn release_lock(&self, session_id: &str) {
        let mut locks = self.locks.lock();
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }
}

fn is_cancel(query: &str) -> bool {
    let token = normalized_token(query);
    CANCEL_TOKENS.contains(&token.as_str())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
