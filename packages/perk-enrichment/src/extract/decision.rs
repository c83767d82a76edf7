//! Crawl decisions through an LLM.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{extract_json_object, prompts, truncate_chars};
use crate::error::{EnrichmentError, Result};
use crate::traits::{
    extractor::DecisionMaker,
    llm::{CompletionRequest, LanguageModel},
};
use crate::types::decision::{CrawlAction, CrawlDecision, DecisionContext};

/// Wire shape of the model's decision.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DecisionResponse {
    /// One of: scrape_further, search_web, aggregate, stop
    pub action: String,

    /// Links to follow, most relevant first (scrape_further only)
    #[serde(default)]
    pub relevant_urls_to_scrape: Vec<String>,

    /// Query to run (search_web only)
    #[serde(default)]
    pub search_query: Option<String>,

    /// Short justification
    #[serde(default)]
    pub reasoning: String,
}

impl TryFrom<DecisionResponse> for CrawlDecision {
    type Error = EnrichmentError;

    fn try_from(response: DecisionResponse) -> Result<Self> {
        let action = match response.action.trim().to_ascii_lowercase().as_str() {
            "scrape_further" => CrawlAction::ScrapeFurther {
                urls: response.relevant_urls_to_scrape,
            },
            "search_web" => {
                let query = response
                    .search_query
                    .map(|q| q.trim().to_string())
                    .filter(|q| !q.is_empty())
                    .ok_or_else(|| EnrichmentError::Llm("search_web without a query".into()))?;
                CrawlAction::SearchWeb { query }
            }
            "aggregate" => CrawlAction::Aggregate,
            "stop" => CrawlAction::Stop,
            other => {
                return Err(EnrichmentError::Llm(
                    format!("unknown crawl action: {}", other).into(),
                ))
            }
        };

        Ok(CrawlDecision {
            action,
            reasoning: response.reasoning,
        })
    }
}

/// Asks the model for the next crawl action.
pub struct LlmDecisionMaker<L: LanguageModel> {
    llm: L,
    max_context_chars: usize,
    system_prompt: String,
}

impl<L: LanguageModel> LlmDecisionMaker<L> {
    pub fn new(llm: L) -> Self {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(DecisionResponse))
            .unwrap_or_default();
        Self {
            llm,
            max_context_chars: 4000,
            system_prompt: prompts::format_decide_system_prompt(&schema),
        }
    }

    /// Characters of the last page shown to the model.
    pub fn with_max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars;
        self
    }
}

#[async_trait]
impl<L: LanguageModel> DecisionMaker for LlmDecisionMaker<L> {
    async fn decide(&self, context: &DecisionContext<'_>) -> Result<CrawlDecision> {
        let gathered = serde_json::to_string_pretty(context.accumulated)?;
        let (last_url, last_content, links) = match context.last_page {
            Some(page) => (
                page.url.as_str(),
                truncate_chars(&page.content, self.max_context_chars),
                page.links.as_slice(),
            ),
            None => ("", "", &[][..]),
        };

        let prompt = prompts::format_decide_prompt(&prompts::DecidePromptArgs {
            name: context.record_name,
            original_description: context.original_description.as_str(),
            gathered_info_json: &gathered,
            links,
            last_url,
            last_content,
            depth: context.depth,
            max_depth: context.max_depth,
            search_performed: context.search_performed,
        });

        let request = CompletionRequest::new(prompt)
            .with_system(self.system_prompt.clone())
            .with_json_response();

        let response = self.llm.complete(&request).await?;
        let json = extract_json_object(&response).ok_or_else(|| {
            warn!("No JSON object in decision response");
            EnrichmentError::Llm("decision response had no JSON object".into())
        })?;

        let parsed: DecisionResponse = serde_json::from_str(json)?;
        let decision = CrawlDecision::try_from(parsed)?;
        debug!(
            action = decision.action.name(),
            reasoning = %decision.reasoning,
            "Crawl decision"
        );
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLanguageModel;
    use crate::types::page::PageContent;
    use crate::types::perk::{FieldValue, PartialPerkRecord};

    fn context<'a>(
        accumulated: &'a [PartialPerkRecord],
        page: Option<&'a PageContent>,
        description: &'a FieldValue,
    ) -> DecisionContext<'a> {
        DecisionContext {
            record_name: "Acme",
            original_description: description,
            accumulated,
            last_page: page,
            depth: 1,
            max_depth: 3,
            search_performed: false,
        }
    }

    #[tokio::test]
    async fn test_parses_scrape_further() {
        let llm = MockLanguageModel::new().with_response(
            r#"{"action": "scrape_further", "relevant_urls_to_scrape": ["/apply"], "search_query": null, "reasoning": "apply page"}"#,
        );
        let maker = LlmDecisionMaker::new(llm.clone());
        let page = PageContent::new("https://acme.example", "Startup program")
            .with_links(vec!["https://acme.example/apply".into()]);
        let description = FieldValue::found("Cloud provider");

        let decision = maker
            .decide(&context(&[], Some(&page), &description))
            .await
            .unwrap();

        assert_eq!(
            decision.action,
            CrawlAction::ScrapeFurther {
                urls: vec!["/apply".into()]
            }
        );
        assert_eq!(decision.reasoning, "apply page");

        let request = &llm.requests()[0];
        assert!(request.json_response);
        assert!(request.prompt.contains("Cloud provider"));
        assert!(request.prompt.contains("https://acme.example/apply"));
        assert!(request
            .system
            .as_deref()
            .unwrap_or_default()
            .contains("relevant_urls_to_scrape"));
    }

    #[tokio::test]
    async fn test_parses_search_and_terminal_actions() {
        let description = FieldValue::NotFound;
        for (raw, expected) in [
            (
                r#"{"action": "search_web", "search_query": "acme startup credits"}"#,
                CrawlAction::SearchWeb {
                    query: "acme startup credits".into(),
                },
            ),
            (r#"{"action": "AGGREGATE"}"#, CrawlAction::Aggregate),
            (r#"{"action": "stop"}"#, CrawlAction::Stop),
        ] {
            let maker = LlmDecisionMaker::new(MockLanguageModel::new().with_response(raw));
            let decision = maker.decide(&context(&[], None, &description)).await.unwrap();
            assert_eq!(decision.action, expected);
        }
    }

    #[tokio::test]
    async fn test_rejects_unknown_or_incomplete_actions() {
        let description = FieldValue::NotFound;
        for raw in [
            r#"{"action": "dance"}"#,
            r#"{"action": "search_web", "search_query": "  "}"#,
            "I think we should stop",
        ] {
            let maker = LlmDecisionMaker::new(MockLanguageModel::new().with_response(raw));
            assert!(maker.decide(&context(&[], None, &description)).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let maker = LlmDecisionMaker::new(MockLanguageModel::failing());
        let description = FieldValue::NotFound;
        assert!(maker.decide(&context(&[], None, &description)).await.is_err());
    }
}
