//! LLM-backed extraction, crawl decisions and page judgement.
//!
//! Each adapter wraps a [`LanguageModel`](crate::traits::llm::LanguageModel)
//! and owns its prompt and response parsing.

mod classifier;
mod decision;
mod fields;
pub mod prompts;

pub use classifier::LlmPageClassifier;
pub use decision::{DecisionResponse, LlmDecisionMaker};
pub use fields::{parse_fields_response, LlmFieldExtractor};

/// Case-insensitive substring match against blocking indicators.
pub fn detect_blocking(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}

/// The first `max_chars` characters, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The span from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
