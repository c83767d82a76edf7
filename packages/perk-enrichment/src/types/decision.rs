//! Crawl decision types.

use serde::{Deserialize, Serialize};

use super::page::PageContent;
use super::perk::{FieldValue, PartialPerkRecord};

/// What the crawl loop should do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CrawlAction {
    /// Follow one of these links
    ScrapeFurther { urls: Vec<String> },

    /// Ask the web search collaborator
    SearchWeb { query: String },

    /// Merge what has been gathered
    Aggregate,

    /// Give up on this record
    Stop,
}

impl CrawlAction {
    pub fn name(&self) -> &'static str {
        match self {
            CrawlAction::ScrapeFurther { .. } => "scrape_further",
            CrawlAction::SearchWeb { .. } => "search_web",
            CrawlAction::Aggregate => "aggregate",
            CrawlAction::Stop => "stop",
        }
    }
}

/// A decision together with the model's reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlDecision {
    pub action: CrawlAction,

    #[serde(default)]
    pub reasoning: String,
}

impl CrawlDecision {
    pub fn new(action: CrawlAction) -> Self {
        Self {
            action,
            reasoning: String::new(),
        }
    }

    pub fn scrape_further<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CrawlAction::ScrapeFurther {
            urls: urls.into_iter().map(Into::into).collect(),
        })
    }

    pub fn search_web(query: impl Into<String>) -> Self {
        Self::new(CrawlAction::SearchWeb {
            query: query.into(),
        })
    }

    pub fn aggregate() -> Self {
        Self::new(CrawlAction::Aggregate)
    }

    pub fn stop() -> Self {
        Self::new(CrawlAction::Stop)
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// Everything the decision maker sees for one step.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub record_name: &'a str,

    /// Description held by the store before this run
    pub original_description: &'a FieldValue,

    /// Extractions gathered so far, in order
    pub accumulated: &'a [PartialPerkRecord],

    pub last_page: Option<&'a PageContent>,

    pub depth: usize,

    pub max_depth: usize,

    pub search_performed: bool,
}
