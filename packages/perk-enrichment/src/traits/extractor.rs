//! LLM-backed capabilities consumed by the engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    decision::{CrawlDecision, DecisionContext},
    perk::PartialPerkRecord,
};

/// Turns page text into a partial perk record.
///
/// Infallible by contract: blocked pages come back all `Blocked`,
/// unparseable model output all `ParseError`.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, page_text: &str) -> PartialPerkRecord;
}

/// Chooses the crawl loop's next action.
///
/// Any `Err` is treated as `stop` by the loop.
#[async_trait]
pub trait DecisionMaker: Send + Sync {
    async fn decide(&self, context: &DecisionContext<'_>) -> Result<CrawlDecision>;
}

/// Judges whether a page that answered 200 is really an error page or
/// a closed form.
///
/// Any `Err` makes the classifier fall back to keyword heuristics.
#[async_trait]
pub trait PageClassifier: Send + Sync {
    async fn is_unavailable(&self, page_text: &str) -> Result<bool>;
}
