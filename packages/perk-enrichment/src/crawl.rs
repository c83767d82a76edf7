//! Bounded crawl-and-decide loop.
//!
//! For one live record: scrape a page, extract fields, ask the decision
//! maker what to do next, and repeat until the depth budget runs out or
//! the loop reaches aggregation. Every failure degrades to aggregation
//! over whatever has been gathered.
//!
//! ```text
//! Scraping --ok--> Deciding --scrape_further--> Scraping (depth + 1)
//!    |                |------search_web-------> Aggregating
//!    |                |------aggregate--------> Aggregating
//!    |                |------stop / error-----> Stopped
//!    '--fail/visited--'------depth >= max-----> Aggregating
//! ```

use indexmap::IndexSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::liveness::normalize_url;
use crate::merge::merge_with;
use crate::security::UrlValidator;
use crate::traits::{
    extractor::{DecisionMaker, FieldExtractor},
    fetcher::PageFetcher,
    searcher::{hits_to_text, WebSearcher},
};
use crate::types::{
    config::{CrawlConfig, MonetaryStrategy},
    decision::{CrawlAction, DecisionContext},
    page::PageContent,
    perk::PartialPerkRecord,
    record::InputRecord,
};

/// Per-record loop state. Discarded once the record is merged.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    /// Canonical URLs in visit order; only ever grows
    pub visited: IndexSet<String>,

    pub accumulated: Vec<PartialPerkRecord>,

    pub depth: usize,

    pub search_performed: bool,
}

/// The decision that led to an explicit end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalAction {
    Aggregate,
    Stop,
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Depth budget exhausted
    MaxDepth,

    /// Decision maker chose to aggregate or stop
    Decided(TerminalAction),

    /// `scrape_further` offered no usable unvisited URL
    NoCandidates,

    /// Fetch failed or returned nothing
    ScrapeFailed,

    /// Current URL was already scraped
    AlreadyVisited,

    /// A web search ran; the loop does not scrape after searching
    Searched,

    /// `search_web` requested but no searcher configured or already used
    SearchUnavailable,

    /// Decision maker failed; treated as stop
    DecisionFailed,

    /// Record had no link
    NoUrl,
}

impl Termination {
    /// Ends that skip the gap search and merge as-is.
    pub fn is_stop(self) -> bool {
        matches!(
            self,
            Termination::Decided(TerminalAction::Stop) | Termination::DecisionFailed
        )
    }

    /// Ends after which missing fields may be looked up by web search.
    pub fn allows_gap_search(self) -> bool {
        !self.is_stop() && self != Termination::NoUrl
    }
}

/// Result of crawling one record.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Merge of `accumulated`
    pub merged: PartialPerkRecord,

    pub accumulated: Vec<PartialPerkRecord>,

    /// Canonical URLs in visit order
    pub visited: Vec<String>,

    pub depth: usize,

    pub search_performed: bool,

    pub termination: Termination,
}

enum Phase {
    Scraping(Option<String>),
    Deciding,
    Aggregating(Termination),
    Stopped(Termination),
}

/// Drives the scrape, extract, decide loop for one record.
pub struct CrawlAndDecide {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn FieldExtractor>,
    decider: Arc<dyn DecisionMaker>,
    searcher: Option<Arc<dyn WebSearcher>>,
    validator: UrlValidator,
    config: CrawlConfig,
    monetary: MonetaryStrategy,
}

impl CrawlAndDecide {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn FieldExtractor>,
        decider: Arc<dyn DecisionMaker>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            decider,
            searcher: None,
            validator: UrlValidator::new(),
            config: CrawlConfig::default(),
            monetary: MonetaryStrategy::default(),
        }
    }

    pub fn with_searcher(mut self, searcher: Arc<dyn WebSearcher>) -> Self {
        self.searcher = Some(searcher);
        self
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_monetary_strategy(mut self, strategy: MonetaryStrategy) -> Self {
        self.monetary = strategy;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn monetary_strategy(&self) -> MonetaryStrategy {
        self.monetary
    }

    /// Crawl one record. Never fails; the worst case is an all
    /// `NotFound` merge.
    pub async fn run(&self, record: &InputRecord) -> CrawlOutcome {
        let mut state = CrawlState::default();
        let mut last_page: Option<PageContent> = None;
        let mut phase = Phase::Scraping(record.link().map(normalize_url));

        let termination = loop {
            phase = match phase {
                Phase::Scraping(None) => Phase::Aggregating(Termination::NoUrl),
                Phase::Scraping(Some(url)) => {
                    let key = canonical(&url);
                    if state.visited.contains(&key) {
                        debug!(record_id = %record.id, url = %url, "Already visited");
                        Phase::Aggregating(Termination::AlreadyVisited)
                    } else {
                        state.visited.insert(key);
                        match self.scrape(&url).await {
                            Some(page) => {
                                let extracted = self.extractor.extract(&page.content).await;
                                state.accumulated.push(extracted);
                                last_page = Some(page);
                                Phase::Deciding
                            }
                            None => Phase::Aggregating(Termination::ScrapeFailed),
                        }
                    }
                }
                Phase::Deciding => self.decide(record, &mut state, last_page.as_ref()).await,
                Phase::Aggregating(termination) => break termination,
                Phase::Stopped(termination) => break termination,
            };
        };

        if termination.allows_gap_search() {
            self.gap_search(record, &mut state).await;
        }

        let merged = merge_with(&state.accumulated, self.monetary);
        info!(
            record_id = %record.id,
            termination = ?termination,
            pages = state.visited.len(),
            sources = state.accumulated.len(),
            missing = merged.missing_fields().len(),
            "Crawl finished"
        );

        CrawlOutcome {
            merged,
            accumulated: state.accumulated,
            visited: state.visited.into_iter().collect(),
            depth: state.depth,
            search_performed: state.search_performed,
            termination,
        }
    }

    async fn scrape(&self, url: &str) -> Option<PageContent> {
        match self.fetcher.fetch(url).await {
            Ok(page) if !page.is_empty() => {
                debug!(url = %url, fetcher = self.fetcher.name(), chars = page.content.len(), "Scraped page");
                Some(page)
            }
            Ok(_) => {
                warn!(url = %url, "Scrape returned no content");
                None
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Scrape failed");
                None
            }
        }
    }

    async fn decide(
        &self,
        record: &InputRecord,
        state: &mut CrawlState,
        last_page: Option<&PageContent>,
    ) -> Phase {
        if state.depth >= self.config.max_depth {
            debug!(record_id = %record.id, depth = state.depth, "Depth budget reached");
            return Phase::Aggregating(Termination::MaxDepth);
        }

        let context = DecisionContext {
            record_name: &record.name,
            original_description: &record.prior.provider_description,
            accumulated: &state.accumulated,
            last_page,
            depth: state.depth,
            max_depth: self.config.max_depth,
            search_performed: state.search_performed,
        };

        let decision = match self.decider.decide(&context).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Decision failed, stopping");
                return Phase::Stopped(Termination::DecisionFailed);
            }
        };

        info!(
            record_id = %record.id,
            depth = state.depth,
            action = decision.action.name(),
            reasoning = %decision.reasoning,
            "Decided next step"
        );

        match decision.action {
            CrawlAction::ScrapeFurther { urls } => {
                let base = last_page.map(|p| p.url.as_str()).unwrap_or_default();
                match self.next_candidate(base, &urls, state) {
                    Some(next) => {
                        state.depth += 1;
                        Phase::Scraping(Some(next))
                    }
                    None => Phase::Aggregating(Termination::NoCandidates),
                }
            }
            CrawlAction::SearchWeb { query } => {
                if state.search_performed {
                    return Phase::Aggregating(Termination::SearchUnavailable);
                }
                match &self.searcher {
                    Some(searcher) => {
                        self.search(searcher.as_ref(), &query, state).await;
                        Phase::Aggregating(Termination::Searched)
                    }
                    None => {
                        debug!(record_id = %record.id, "No searcher configured");
                        Phase::Aggregating(Termination::SearchUnavailable)
                    }
                }
            }
            CrawlAction::Aggregate => {
                Phase::Aggregating(Termination::Decided(TerminalAction::Aggregate))
            }
            CrawlAction::Stop => Phase::Stopped(Termination::Decided(TerminalAction::Stop)),
        }
    }

    /// First candidate that resolves, validates and is unvisited.
    fn next_candidate(&self, base: &str, urls: &[String], state: &CrawlState) -> Option<String> {
        urls.iter()
            .take(self.config.max_candidate_urls)
            .filter_map(|candidate| match self.validator.resolve(base, candidate) {
                Ok(url) => Some(url.to_string()),
                Err(e) => {
                    debug!(candidate = %candidate, error = %e, "Skipping candidate URL");
                    None
                }
            })
            .find(|url| !state.visited.contains(&canonical(url)))
    }

    /// Run one search and extract from its text. Marks the search as
    /// performed even when it fails.
    async fn search(&self, searcher: &dyn WebSearcher, query: &str, state: &mut CrawlState) {
        state.search_performed = true;

        match searcher.search(query).await {
            Ok(hits) => {
                let text = hits_to_text(&hits);
                debug!(query = %query, searcher = searcher.name(), hits = hits.len(), "Search finished");
                if !text.trim().is_empty() {
                    state.accumulated.push(self.extractor.extract(&text).await);
                }
            }
            Err(e) => warn!(query = %query, error = %e, "Search failed"),
        }
    }

    /// One search for fields still missing at aggregation.
    async fn gap_search(&self, record: &InputRecord, state: &mut CrawlState) {
        if state.search_performed || !self.config.gap_search {
            return;
        }
        let Some(searcher) = &self.searcher else {
            return;
        };

        let missing = merge_with(&state.accumulated, self.monetary).missing_fields();
        if missing.is_empty() {
            return;
        }

        let labels: Vec<&str> = missing.iter().map(|f| f.label()).collect();
        let query = format!("{} {}", record.name, labels.join(" "));
        info!(record_id = %record.id, query = %query, "Searching for missing fields");
        self.search(searcher.as_ref(), &query, state).await;
    }
}

/// Visited-set key: parsed and re-serialised, fragment dropped.
fn canonical(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}
