//! Property-based tests for the dialogue layer
//!
//! These tests check that the transfer flow only moves forward and that
//! confidence thresholds gate routing for every score.

use super::manager::LOW_CONFIDENCE_REPLY;
use super::transfer::*;
use super::*;
use crate::classifier::{Classification, ClassifierPort, IntentClassifier};
use crate::context::{ContextStore, InMemoryContextStore};
use crate::sessions::{DialogueState, InMemorySessionStore, SessionStore, TransferStage};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

/// Classifies every utterance as the same intent and score.
struct Constant(Classification);

#[async_trait]
impl IntentClassifier for Constant {
    async fn classify(&self, _text: &str, _context: &[String]) -> anyhow::Result<Classification> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "constant"
    }
}

fn manager(label: &str, confidence: f64) -> (DialogueManager, Arc<dyn SessionStore>) {
    let context: Arc<dyn ContextStore> = Arc::new(InMemoryContextStore::new());
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(context.clone()));
    let port = ClassifierPort::new(
        Arc::new(Constant(Classification::new(label, confidence))),
        500,
    );
    let manager = DialogueManager::new(
        port,
        sessions.clone(),
        context,
        ToolRegistry::new(),
        DialogueSettings::default(),
    );
    (manager, sessions)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_utterance() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z ]{1,12}",
        (1u32..20_000).prop_map(|n| format!("${n}")),
        (1u32..20_000).prop_map(|n| n.to_string()),
        Just("yes".to_string()),
        Just("no".to_string()),
        "[$₹,0-9.]{1,8}",
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Stage only advances or holds; a terminal step ends the walk.
    #[test]
    fn prop_stage_is_monotonic(inputs in proptest::collection::vec(arb_utterance(), 0..12)) {
        let limits = TransferLimits::default();
        let mut state = entry_state();

        for input in inputs {
            match transition(&state, &input, &limits) {
                TransferStep::Prompt { state: next, .. } => {
                    prop_assert!(next.stage >= state.stage, "{:?} -> {:?}", state.stage, next.stage);
                    prop_assert!(next.stage.is_some());
                    prop_assert_eq!(next.active_intent.as_deref(), Some(TRANSFER_INTENT));
                    state = next;
                }
                TransferStep::Execute { .. } | TransferStep::Cancelled { .. } => {
                    prop_assert_eq!(state.stage, Some(TransferStage::Confirm));
                    break;
                }
            }
        }
    }

    // Amount is only ever recorded together with the confirm stage.
    #[test]
    fn prop_amount_set_only_at_confirm(inputs in proptest::collection::vec(arb_utterance(), 0..12)) {
        let limits = TransferLimits::default();
        let mut state = entry_state();

        for input in inputs {
            match transition(&state, &input, &limits) {
                TransferStep::Prompt { state: next, .. } => {
                    prop_assert_eq!(next.amount.is_some(), next.stage == Some(TransferStage::Confirm));
                    if let Some(amount) = next.amount {
                        prop_assert!(amount > Decimal::ZERO && amount <= limits.max_amount);
                    }
                    state = next;
                }
                _ => break,
            }
        }
    }

    // Below the routing bar with no active flow, nothing routes and no state is set.
    #[test]
    fn prop_low_confidence_never_routes(confidence in 0.0f64..0.5, label in "[a-z_]{3,12}") {
        let (manager, sessions) = manager(&label, confidence);
        let rt = runtime();
        let result = rt.block_on(manager.process_turn("s1", "some request"));
        prop_assert_eq!(result.response.as_str(), LOW_CONFIDENCE_REPLY);
        prop_assert!((result.confidence - confidence).abs() < 1e-12);

        let state = rt.block_on(sessions.get("s1")).unwrap().unwrap_or_default();
        prop_assert_eq!(state, DialogueState::default());
    }

    // Mid-flow, a different intent switches only at or above the switch bar.
    #[test]
    fn prop_switch_bar(confidence in 0.5f64..=1.0) {
        let (manager, sessions) = manager("balance", confidence);
        let rt = runtime();
        rt.block_on(sessions.save("s1", entry_state())).unwrap();

        let result = rt.block_on(manager.process_turn("s1", "checking"));
        let state = rt.block_on(sessions.get("s1")).unwrap().unwrap();
        if confidence >= 0.8 {
            prop_assert_eq!(result.intent.as_str(), "balance");
            prop_assert_eq!(state.active_intent.as_deref(), Some("balance"));
            prop_assert!(state.stage.is_none());
        } else {
            prop_assert_eq!(result.intent.as_str(), TRANSFER_INTENT);
            prop_assert!((result.confidence - 1.0).abs() < f64::EPSILON);
            prop_assert_eq!(state.stage, Some(TransferStage::Destination));
        }
    }
}
