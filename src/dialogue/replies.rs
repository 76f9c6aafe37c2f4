//! Canned acknowledgements for intents that need no backend call.

const CANNED_REPLIES: &[(&str, &str)] = &[
    ("greeting", "Hi there! How can I assist you today?"),
    ("exit", "Thank you for contacting us. Goodbye!"),
    (
        "transaction_history",
        "Fetching your last 5 transactions.",
    ),
    (
        "lost_card",
        "We have blocked your card. A new card will be sent to your address.",
    ),
    ("block_card", "Card has been blocked successfully."),
    (
        "pin_reset",
        "To reset your PIN, we'll send an OTP to your registered number.",
    ),
    ("faq", "Visit our FAQ page at bank.com/faq"),
    (
        "complaint",
        "We are sorry to hear that. Please describe your issue.",
    ),
    (
        "mortgage_inquiry",
        "Are you looking for personal or home loans?",
    ),
    (
        "credit_card",
        "Would you like to apply for a new credit card or manage an existing one?",
    ),
    (
        "debit_card",
        "You can manage your debit card from the cards section in the app.",
    ),
    (
        "investment_options",
        "We offer mutual funds and fixed deposits. Would you like help with these?",
    ),
    ("customer_support", "Our support team is available 24/7."),
];

/// Fixed reply for `intent`, if it has one.
pub fn canned_reply(intent: &str) -> Option<&'static str> {
    CANNED_REPLIES
        .iter()
        .find(|(name, _)| *name == intent)
        .map(|(_, reply)| *reply)
}

/// Reply for a routed intent with neither a tool nor a canned answer.
pub fn acknowledgement(intent: &str) -> String {
    format!("Intent '{intent}' identified.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_intents_have_replies() {
        assert_eq!(
            canned_reply("greeting"),
            Some("Hi there! How can I assist you today?")
        );
        assert_eq!(
            canned_reply("exit"),
            Some("Thank you for contacting us. Goodbye!")
        );
    }

    #[test]
    fn unknown_intents_get_acknowledged() {
        assert_eq!(canned_reply("close_account"), None);
        assert_eq!(
            acknowledgement("close_account"),
            "Intent 'close_account' identified."
        );
    }
}
