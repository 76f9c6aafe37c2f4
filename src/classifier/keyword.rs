//! Deterministic keyword classifier for offline use.
//!
//! Scores each intent by how many of its phrases appear in the utterance as
//! whole words. A unique winner gets a confidence that grows with the number of
//! hits and the lead over the runner-up; ties score below the routing bar.

use anyhow::Result;
use async_trait::async_trait;

use super::traits::{Classification, IntentClassifier};

/// Phrases per intent, matched as whole words.
const INTENT_PHRASES: &[(&str, &[&str])] = &[
    ("balance", &["balance", "how much money", "available funds"]),
    (
        "transfer",
        &["transfer", "transfer money", "transfer funds", "send money", "move money"],
    ),
    (
        "block_card",
        &["block", "lost card", "stolen card", "freeze my card", "lock my card"],
    ),
    ("fraud_report", &["fraud", "fraudulent", "suspicious", "unauthorized"]),
    (
        "open_account",
        &["open account", "open an account", "open a new account", "new account"],
    ),
    ("close_account", &["close account", "close my account"]),
    ("loan_application", &["loan", "borrow", "loan status", "loan application"]),
    ("mortgage_inquiry", &["mortgage", "home loan"]),
    (
        "transaction_history",
        &["transactions", "transaction history", "recent transactions"],
    ),
    ("account_statement", &["statement", "bank statement"]),
    ("pin_reset", &["pin", "reset my pin", "forgot my pin"]),
    (
        "customer_support",
        &["support", "customer service", "speak to an agent", "help"],
    ),
    ("bill_payment", &["pay my bill", "bill payment", "pay bill", "utility bill"]),
    ("card_activation", &["activate", "activation"]),
    ("branch_locator", &["branch", "nearest atm", "atm near"]),
    ("interest_rates", &["interest rate", "interest rates", "apy"]),
    (
        "investment_options",
        &["invest", "investment", "mutual fund", "fixed deposit"],
    ),
    ("greeting", &["hello", "hi", "hey", "good morning", "good evening"]),
    ("exit", &["goodbye", "bye", "thats all"]),
];

#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Names of every intent this classifier can produce.
    pub fn intents() -> impl Iterator<Item = &'static str> {
        INTENT_PHRASES.iter().map(|(intent, _)| *intent)
    }

    fn score(text: &str) -> Classification {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase())
            .collect();
        if words.is_empty() {
            return Classification::fallback();
        }
        let padded = format!(" {} ", words.join(" "));

        let mut best: Option<(&str, usize)> = None;
        let mut runner_up = 0usize;
        for (intent, phrases) in INTENT_PHRASES {
            let hits = phrases
                .iter()
                .filter(|p| padded.contains(&format!(" {p} ")))
                .count();
            match best {
                Some((_, top)) if hits > top => {
                    runner_up = top;
                    best = Some((intent, hits));
                }
                Some(_) => runner_up = runner_up.max(hits),
                None => best = Some((intent, hits)),
            }
        }

        match best {
            Some((intent, hits)) if hits > 0 => {
                if hits == runner_up {
                    return Classification::new(intent, 0.4);
                }
                let margin = (hits - runner_up) as f64;
                let confidence = (0.5 + 0.15 * hits as f64 + 0.15 * margin).min(0.95);
                Classification::new(intent, confidence)
            }
            _ => Classification::fallback(),
        }
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str, _context: &[String]) -> Result<Classification> {
        Ok(Self::score(text))
    }

    fn name(&self) -> &str {
        "keyword"
    }
}
