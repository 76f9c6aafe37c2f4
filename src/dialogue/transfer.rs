//! Slot-filling flow for money transfers.
//!
//! The flow collects source, destination and amount, then asks for
//! confirmation. [`transition`] is pure: it takes the current state and the
//! raw utterance and returns what to do next, leaving persistence and tool
//! calls to the caller.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::normalized_token;
use crate::sessions::{DialogueState, TransferStage};

/// Intent name that owns this flow.
pub const TRANSFER_INTENT: &str = "transfer";

const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "confirm", "y"];

/// Characters dropped from an amount before parsing.
const AMOUNT_NOISE: &[char] = &['$', '₹', ','];

pub const START_PROMPT: &str = "Sure, from which account would you like to transfer funds?";
pub const CANCELLED_REPLY: &str = "Transfer cancelled.";

/// Business limits applied while collecting the amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLimits {
    pub max_amount: Decimal,
    pub currency_symbol: String,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_amount: Decimal::from(10_000),
            currency_symbol: "$".to_string(),
        }
    }
}

/// Outcome of feeding one utterance to the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferStep {
    /// Flow continues; persist `state` and reply with `response`.
    Prompt {
        state: DialogueState,
        response: String,
    },
    /// User confirmed; run the transfer tool with `summary`, then reset.
    Execute {
        state: DialogueState,
        summary: String,
    },
    /// User declined at confirmation; reply and reset.
    Cancelled { response: String },
}

/// State of a flow that has just been entered.
pub fn entry_state() -> DialogueState {
    DialogueState {
        stage: Some(TransferStage::Source),
        ..DialogueState::with_intent(TRANSFER_INTENT)
    }
}

/// Entry state plus the opening prompt.
pub fn start() -> TransferStep {
    prompt(entry_state(), START_PROMPT)
}

/// Advance the flow by one utterance.
pub fn transition(state: &DialogueState, input: &str, limits: &TransferLimits) -> TransferStep {
    let Some(stage) = state.stage else {
        return start();
    };
    let text = input.trim();

    match stage {
        TransferStage::Source => {
            if text.is_empty() {
                return prompt(
                    state.clone(),
                    "Please tell me which account you would like to transfer from.",
                );
            }
            let next = DialogueState {
                stage: Some(TransferStage::Destination),
                source: Some(text.to_string()),
                ..state.clone()
            };
            let response =
                format!("Got it, from {text}. Which account would you like to transfer to?");
            prompt(next, response)
        }
        TransferStage::Destination => {
            if text.is_empty() {
                return prompt(
                    state.clone(),
                    "Please tell me which account you would like to transfer to.",
                );
            }
            let next = DialogueState {
                stage: Some(TransferStage::Amount),
                destination: Some(text.to_string()),
                ..state.clone()
            };
            let response = format!("How much would you like to transfer to {text}?");
            prompt(next, response)
        }
        TransferStage::Amount => match parse_amount(text) {
            Some(amount) if amount > limits.max_amount => prompt(
                state.clone(),
                format!(
                    "Insufficient balance. The maximum transfer amount is {}{}. Please enter a smaller amount.",
                    limits.currency_symbol,
                    limits.max_amount.normalize()
                ),
            ),
            Some(amount) => {
                let next = DialogueState {
                    stage: Some(TransferStage::Confirm),
                    amount: Some(amount),
                    ..state.clone()
                };
                let response = format!(
                    "Please confirm: transfer {}{} from {} to {}? Say yes to confirm.",
                    limits.currency_symbol,
                    amount,
                    slot(&next.source),
                    slot(&next.destination)
                );
                prompt(next, response)
            }
            None => prompt(
                state.clone(),
                format!(
                    "That is not a valid amount. Please enter the amount to transfer, for example {}200.",
                    limits.currency_symbol
                ),
            ),
        },
        TransferStage::Confirm => {
            if is_affirmative(text) {
                let summary = format!(
                    "Transfer {} from {} to {}",
                    state.amount.unwrap_or_default(),
                    slot(&state.source),
                    slot(&state.destination)
                );
                TransferStep::Execute {
                    state: DialogueState {
                        confirmed: true,
                        ..state.clone()
                    },
                    summary,
                }
            } else {
                TransferStep::Cancelled {
                    response: CANCELLED_REPLY.to_string(),
                }
            }
        }
    }
}

/// Parse a positive amount, ignoring currency symbols and thousands separators.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| !AMOUNT_NOISE.contains(c) && !c.is_whitespace())
        .collect();
    let amount = Decimal::from_str(&cleaned).ok()?.normalize();
    (amount > Decimal::ZERO).then_some(amount)
}

pub fn is_affirmative(text: &str) -> bool {
    let token = normalized_token(text);
    AFFIRMATIVE_TOKENS.contains(&token.as_str())
}

fn prompt(state: DialogueState, response: impl Into<String>) -> TransferStep {
    TransferStep::Prompt {
        state,
        response: response.into(),
    }
}

fn slot(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("your account")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> TransferLimits {
        TransferLimits::default()
    }

    fn expect_prompt(step: TransferStep) -> (DialogueState, String) {
        match step {
            TransferStep::Prompt { state, response } => (state, response),
            other => panic!("expected prompt, got {other:?}"),
        }
    }

    fn at_stage(stage: TransferStage) -> DialogueState {
        DialogueState {
            stage: Some(stage),
            source: Some("checking".into()),
            destination: (stage >= TransferStage::Amount).then(|| "savings".to_string()),
            amount: (stage == TransferStage::Confirm).then(|| Decimal::from(200)),
            ..DialogueState::with_intent(TRANSFER_INTENT)
        }
    }

    #[test]
    fn start_enters_source_stage() {
        let (state, response) = expect_prompt(start());
        assert_eq!(state.active_intent.as_deref(), Some("transfer"));
        assert_eq!(state.stage, Some(TransferStage::Source));
        assert_eq!(response, START_PROMPT);
    }

    #[test]
    fn walks_through_every_slot() {
        let (state, _) = expect_prompt(start());
        let (state, response) = expect_prompt(transition(&state, "checking", &limits()));
        assert_eq!(state.stage, Some(TransferStage::Destination));
        assert!(response.contains("checking"));

        let (state, response) = expect_prompt(transition(&state, " savings ", &limits()));
        assert_eq!(state.stage, Some(TransferStage::Amount));
        assert_eq!(state.destination.as_deref(), Some("savings"));
        assert!(response.contains("savings"));

        let (state, response) = expect_prompt(transition(&state, "$200", &limits()));
        assert_eq!(state.stage, Some(TransferStage::Confirm));
        assert_eq!(state.amount, Some(Decimal::from(200)));
        assert_eq!(
            response,
            "Please confirm: transfer $200 from checking to savings? Say yes to confirm."
        );

        match transition(&state, "Yes", &limits()) {
            TransferStep::Execute { state, summary } => {
                assert!(state.confirmed);
                assert_eq!(summary, "Transfer 200 from checking to savings");
            }
            other => panic!("expected execute, got {other:?}"),
        }
    }

    #[test]
    fn blank_slot_input_reprompts() {
        let state = at_stage(TransferStage::Source);
        let (next, _) = expect_prompt(transition(&state, "   ", &limits()));
        assert_eq!(next, state);
    }

    #[test]
    fn over_limit_holds_at_amount() {
        let state = at_stage(TransferStage::Amount);
        let (next, response) = expect_prompt(transition(&state, "$15000", &limits()));
        assert_eq!(next, state);
        assert!(response.starts_with("Insufficient balance."));
        assert!(response.contains("$10000"));
    }

    #[test]
    fn limit_itself_is_allowed() {
        let state = at_stage(TransferStage::Amount);
        let (next, _) = expect_prompt(transition(&state, "10,000", &limits()));
        assert_eq!(next.stage, Some(TransferStage::Confirm));
    }

    #[test]
    fn unparseable_amount_holds_at_amount() {
        let state = at_stage(TransferStage::Amount);
        for input in ["lots", "", "-5", "0", "$"] {
            let (next, response) = expect_prompt(transition(&state, input, &limits()));
            assert_eq!(next, state, "{input:?} should not advance");
            assert!(response.contains("not a valid amount"));
        }
    }

    #[test]
    fn amounts_accept_currency_notation() {
        assert_eq!(parse_amount("₹1,500"), Some(Decimal::from(1500)));
        assert_eq!(parse_amount("$ 200.50"), Decimal::from_str("200.5").ok());
        assert_eq!(parse_amount("200.00"), Some(Decimal::from(200)));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn anything_but_affirmation_cancels() {
        let state = at_stage(TransferStage::Confirm);
        for input in ["no", "maybe", "yes please", ""] {
            assert_eq!(
                transition(&state, input, &limits()),
                TransferStep::Cancelled {
                    response: CANCELLED_REPLY.into()
                }
            );
        }
    }

    #[test]
    fn affirmations_ignore_case_and_punctuation() {
        for input in ["yes", "YES", " y ", "Confirm.", "yes!"] {
            assert!(is_affirmative(input), "{input:?}");
        }
        assert!(!is_affirmative("yeah"));
    }

    #[test]
    fn custom_limits_apply() {
        let limits = TransferLimits {
            max_amount: Decimal::from(500),
            currency_symbol: "₹".into(),
        };
        let state = at_stage(TransferStage::Amount);
        let (_, response) = expect_prompt(transition(&state, "₹600", &limits));
        assert!(response.contains("₹500"));
    }

    #[test]
    fn missing_stage_restarts_flow() {
        let state = DialogueState::with_intent(TRANSFER_INTENT);
        assert_eq!(transition(&state, "whatever", &limits()), start());
    }
}
