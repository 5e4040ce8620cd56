//! Routing decision between whole-document summarization and pointed lookup.

/// Trigger phrases that mark a query as a whole-document summary request.
const SUMMARY_TRIGGERS: [&str; 6] = [
    "summarize",
    "summary",
    "overview",
    "high level",
    "what is this document about",
    "entire document",
];

/// Returns `true` iff the query asks for a whole-document summary.
///
/// Purely local case-insensitive substring matching; no service call.
pub fn is_summary_query(query: &str) -> bool {
    let lowered = query.to_lowercase();
    SUMMARY_TRIGGERS
        .iter()
        .any(|trigger| lowered.contains(trigger))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_phrasings_are_detected() {
        assert!(is_summary_query("Can you give me an overview?"));
        assert!(is_summary_query("SUMMARIZE the entire document please"));
        assert!(is_summary_query("What is this document about"));
        assert!(is_summary_query("a high level description would help"));
    }

    #[test]
    fn pointed_lookups_are_not_summaries() {
        assert!(!is_summary_query("What is the refund policy?"));
        assert!(!is_summary_query("When do items ship?"));
        assert!(!is_summary_query(""));
    }
}
