//! Fake-error and closed-form detection through an LLM.

use async_trait::async_trait;
use tracing::debug;

use super::{prompts, truncate_chars};
use crate::error::{EnrichmentError, Result};
use crate::traits::{
    extractor::PageClassifier,
    llm::{CompletionRequest, LanguageModel},
};

/// Asks the model for a strict YES/NO on page availability.
pub struct LlmPageClassifier<L: LanguageModel> {
    llm: L,
    max_input_chars: usize,
}

impl<L: LanguageModel> LlmPageClassifier<L> {
    pub fn new(llm: L) -> Self {
        Self {
            llm,
            max_input_chars: 15_000,
        }
    }

    pub fn with_max_input_chars(mut self, chars: usize) -> Self {
        self.max_input_chars = chars;
        self
    }
}

#[async_trait]
impl<L: LanguageModel> PageClassifier for LlmPageClassifier<L> {
    async fn is_unavailable(&self, page_text: &str) -> Result<bool> {
        let text = truncate_chars(page_text, self.max_input_chars);
        let request = CompletionRequest::new(prompts::format_classify_page_prompt(text))
            .with_max_tokens(5);

        let answer = self.llm.complete(&request).await?;
        let word = answer
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphabetic())
            .to_ascii_uppercase();

        debug!(answer = %word, "Page classifier answer");
        match word.as_str() {
            "YES" => Ok(true),
            "NO" => Ok(false),
            _ => Err(EnrichmentError::Llm(
                format!("expected YES or NO, got: {}", answer.trim()).into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLanguageModel;

    #[tokio::test]
    async fn test_yes_and_no() {
        let yes = LlmPageClassifier::new(MockLanguageModel::new().with_response(" YES."));
        assert!(yes.is_unavailable("Applications are closed").await.unwrap());

        let no = LlmPageClassifier::new(MockLanguageModel::new().with_response("no"));
        assert!(!no.is_unavailable("Apply now").await.unwrap());
    }

    #[tokio::test]
    async fn test_anything_else_is_an_error() {
        let unsure = LlmPageClassifier::new(MockLanguageModel::new().with_response("Maybe, hard to say"));
        assert!(unsure.is_unavailable("Apply now").await.is_err());
    }
}
