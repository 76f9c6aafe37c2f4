//! Input hygiene for user utterances and PII masking.
//!
//! Every utterance passes through [`validate_query`] and [`sanitize`] before it
//! reaches a classifier backend. Anything surfaced to a caller or written to a
//! log goes through [`mask_sensitive`], which hides account and card numbers.

use regex::Regex;
use std::sync::OnceLock;

/// Replacement for runs of 12 or more digits.
pub const MASK_TOKEN: &str = "******";

/// Default ceiling on utterance length, in characters.
pub const DEFAULT_MAX_QUERY_CHARS: usize = 500;

/// Why an utterance was refused before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRejection {
    Empty,
    TooLong { max_chars: usize },
}

impl InputRejection {
    /// User-facing explanation for the rejection.
    pub fn message(self) -> String {
        match self {
            Self::Empty => "Query cannot be empty.".to_string(),
            Self::TooLong { max_chars } => {
                format!("Query is too long. Please keep it under {max_chars} characters.")
            }
        }
    }
}

/// Reject blank utterances and utterances longer than `max_chars` characters.
pub fn validate_query(query: &str, max_chars: usize) -> Result<(), InputRejection> {
    if query.trim().is_empty() {
        return Err(InputRejection::Empty);
    }
    if query.chars().count() > max_chars {
        return Err(InputRejection::TooLong { max_chars });
    }
    Ok(())
}

/// Keep only ASCII letters, digits and plain spaces.
pub fn sanitize(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

fn long_digit_run() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{12,}").expect("digit-run pattern is valid"))
}

/// Replace every run of 12+ digits with [`MASK_TOKEN`].
pub fn mask_sensitive(text: &str) -> String {
    long_digit_run().replace_all(text, MASK_TOKEN).into_owned()
}
