//! Turn logging and Prometheus counters.
//!
//! Counters live in a process-wide registry created on first use. The gateway
//! serves them at `/metrics` via [`encode_metrics`].

use anyhow::Result;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

use crate::security::mask_sensitive;

pub struct Metrics {
    registry: Registry,
    /// Turns processed, by decision kind.
    pub turns: IntCounterVec,
    /// Turns by resolved intent.
    pub intents: IntCounterVec,
    /// Tool invocations, by tool and outcome (`ok`, `error`, `timeout`).
    pub tool_calls: IntCounterVec,
    /// Utterances that came back from the classifier port as fallback.
    pub classifier_fallbacks: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let turns = IntCounterVec::new(
            Opts::new("ivr_turns_total", "Dialogue turns processed"),
            &["decision"],
        )?;
        let intents = IntCounterVec::new(
            Opts::new("ivr_intents_total", "Dialogue turns by resolved intent"),
            &["intent"],
        )?;
        let tool_calls = IntCounterVec::new(
            Opts::new("ivr_tool_calls_total", "Backend tool invocations"),
            &["tool", "outcome"],
        )?;
        let classifier_fallbacks = IntCounter::new(
            "ivr_classifier_fallbacks_total",
            "Utterances resolved to the fallback intent by the classifier port",
        )?;

        registry.register(Box::new(turns.clone()))?;
        registry.register(Box::new(intents.clone()))?;
        registry.register(Box::new(tool_calls.clone()))?;
        registry.register(Box::new(classifier_fallbacks.clone()))?;

        Ok(Self {
            registry,
            turns,
            intents,
            tool_calls,
            classifier_fallbacks,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Process-wide metrics.
///
/// # Panics
///
/// Only if the fixed metric definitions above are invalid.
pub fn metrics() -> &'static Metrics {
    static METRICS: OnceLock<Metrics> = OnceLock::new();
    METRICS.get_or_init(|| Metrics::new().expect("static metric definitions are valid"))
}

/// Render every registered metric in the Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let families = metrics().registry().gather();
    Ok(TextEncoder::new().encode_to_string(&families)?)
}

/// Emit the per-turn log record and bump the turn counters.
///
/// `query` and `response` are masked before they reach the log.
pub fn log_turn(
    session_id: &str,
    query: &str,
    intent: &str,
    confidence: f64,
    response: &str,
    decision: &str,
) {
    let m = metrics();
    m.turns.with_label_values(&[decision]).inc();
    m.intents.with_label_values(&[intent]).inc();

    tracing::info!(
        session_id,
        query = %mask_sensitive(query),
        intent = %mask_sensitive(intent),
        confidence,
        response = %mask_sensitive(response),
        decision,
        "turn processed"
    );
}
