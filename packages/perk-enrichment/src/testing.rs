//! Testing utilities including mock implementations.
//!
//! Every mock is `Clone` and shares its state, so a test can hand one
//! copy to the engine and keep another for assertions.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use crate::error::{EnrichmentError, FetchError, FetchResult, Result};
use crate::traits::{
    extractor::{DecisionMaker, FieldExtractor, PageClassifier},
    fetcher::{BrowserFetcher, HttpProbe, PageFetcher},
    llm::{CompletionRequest, LanguageModel},
    searcher::WebSearcher,
};
use crate::types::{
    decision::{CrawlDecision, DecisionContext},
    page::{PageContent, ProbeResponse, RenderedPage, SearchHit},
    perk::PartialPerkRecord,
};

fn unreachable_url(url: &str) -> FetchError {
    FetchError::Http(format!("mock: no response configured for {}", url).into())
}

/// A mock language model returning canned text.
///
/// Responses are served in order; the last one repeats.
#[derive(Clone, Default)]
pub struct MockLanguageModel {
    responses: Arc<RwLock<VecDeque<String>>>,
    failing: bool,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose every call fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.write().unwrap().push_back(response.into());
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.write().unwrap().push(request.clone());

        if self.failing {
            return Err(EnrichmentError::Llm("mock: model unavailable".into()));
        }

        let mut responses = self.responses.write().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        response.ok_or_else(|| EnrichmentError::Llm("mock: no response configured".into()))
    }
}

/// A mock HTTP probe with per-URL statuses.
///
/// GET responses are queued per URL; the last one repeats. URLs with no
/// configuration fail at the transport level.
#[derive(Clone, Default)]
pub struct MockProbe {
    heads: Arc<RwLock<HashMap<String, u16>>>,
    gets: Arc<RwLock<HashMap<String, VecDeque<ProbeResponse>>>>,
    failing_gets: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head_status(self, url: impl Into<String>, status: u16) -> Self {
        self.heads.write().unwrap().insert(url.into(), status);
        self
    }

    pub fn get_status(self, url: &str, status: u16, body: &str) -> Self {
        self.gets
            .write()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(ProbeResponse::new(status, url).with_body(body));
        self
    }

    pub fn get_fails(self, url: impl Into<String>) -> Self {
        self.failing_gets.write().unwrap().insert(url.into());
        self
    }

    /// HEAD and GET calls together.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl HttpProbe for MockProbe {
    async fn head(&self, url: &str) -> FetchResult<ProbeResponse> {
        self.calls.write().unwrap().push(url.to_string());

        self.heads
            .read()
            .unwrap()
            .get(url)
            .map(|status| ProbeResponse::new(*status, url))
            .ok_or_else(|| unreachable_url(url))
    }

    async fn get(&self, url: &str) -> FetchResult<ProbeResponse> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failing_gets.read().unwrap().contains(url) {
            return Err(unreachable_url(url));
        }

        let mut gets = self.gets.write().unwrap();
        let queue = gets.get_mut(url).ok_or_else(|| unreachable_url(url))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| unreachable_url(url))
    }
}

/// A mock headless browser.
#[derive(Clone, Default)]
pub struct MockBrowser {
    pages: Arc<RwLock<HashMap<String, String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.write().unwrap().insert(url.into(), html.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl BrowserFetcher for MockBrowser {
    async fn render(&self, url: &str) -> FetchResult<RenderedPage> {
        self.calls.write().unwrap().push(url.to_string());

        self.pages
            .read()
            .unwrap()
            .get(url)
            .map(|html| RenderedPage::new(url, html.clone()))
            .ok_or_else(|| unreachable_url(url))
    }
}

/// A mock page judge with a fixed answer.
#[derive(Clone, Default)]
pub struct MockPageClassifier {
    answer: Option<bool>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockPageClassifier {
    pub fn answering(unavailable: bool) -> Self {
        Self {
            answer: Some(unavailable),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl PageClassifier for MockPageClassifier {
    async fn is_unavailable(&self, page_text: &str) -> Result<bool> {
        self.calls.write().unwrap().push(page_text.to_string());
        self.answer
            .ok_or_else(|| EnrichmentError::Llm("mock: classifier unavailable".into()))
    }
}

/// A mock page fetcher serving fixed content by URL.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, PageContent>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `url`.
    pub fn with_page(self, url: impl Into<String>, content: impl Into<String>) -> Self {
        let url = url.into();
        let page = PageContent::new(url.clone(), content);
        self.pages.write().unwrap().insert(url, page);
        self
    }

    /// Serve a fully built page under its own URL.
    pub fn with_content(self, page: PageContent) -> Self {
        self.pages.write().unwrap().insert(page.url.clone(), page);
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        self.calls.write().unwrap().push(url.to_string());

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| unreachable_url(url))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock field extractor keyed by exact input text.
#[derive(Clone, Default)]
pub struct MockExtractor {
    results: Arc<RwLock<HashMap<String, PartialPerkRecord>>>,
    default: Arc<RwLock<PartialPerkRecord>>,
    inputs: Arc<RwLock<Vec<String>>>,
}

impl MockExtractor {
    /// Extracts all `NotFound` unless configured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(self, record: PartialPerkRecord) -> Self {
        *self.default.write().unwrap() = record;
        self
    }

    pub fn with_result_for(self, text: impl Into<String>, record: PartialPerkRecord) -> Self {
        self.results.write().unwrap().insert(text.into(), record);
        self
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inputs.read().unwrap().len()
    }
}

#[async_trait]
impl FieldExtractor for MockExtractor {
    async fn extract(&self, page_text: &str) -> PartialPerkRecord {
        self.inputs.write().unwrap().push(page_text.to_string());

        self.results
            .read()
            .unwrap()
            .get(page_text)
            .cloned()
            .unwrap_or_else(|| self.default.read().unwrap().clone())
    }
}

/// What a [`MockDecisionMaker`] saw on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub record_name: String,
    pub depth: usize,
    pub max_depth: usize,
    pub search_performed: bool,
    pub accumulated: usize,
    pub last_url: Option<String>,
}

impl ContextSnapshot {
    fn capture(context: &DecisionContext<'_>) -> Self {
        Self {
            record_name: context.record_name.to_string(),
            depth: context.depth,
            max_depth: context.max_depth,
            search_performed: context.search_performed,
            accumulated: context.accumulated.len(),
            last_url: context.last_page.map(|p| p.url.clone()),
        }
    }
}

type DecideFn = dyn Fn(&DecisionContext<'_>) -> Result<CrawlDecision> + Send + Sync;

/// A mock decision maker.
///
/// Serves queued decisions first, then the `always` decision. With
/// neither it fails, which the crawl loop treats as stop.
#[derive(Clone, Default)]
pub struct MockDecisionMaker {
    queue: Arc<RwLock<VecDeque<CrawlDecision>>>,
    always: Option<CrawlDecision>,
    decide_fn: Option<Arc<DecideFn>>,
    contexts: Arc<RwLock<Vec<ContextSnapshot>>>,
}

impl MockDecisionMaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `decision`.
    pub fn always(decision: CrawlDecision) -> Self {
        Self {
            always: Some(decision),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// Compute each decision from the context.
    pub fn with_fn<F>(decide: F) -> Self
    where
        F: Fn(&DecisionContext<'_>) -> Result<CrawlDecision> + Send + Sync + 'static,
    {
        Self {
            decide_fn: Some(Arc::new(decide)),
            ..Default::default()
        }
    }

    /// Queue one decision.
    pub fn then(self, decision: CrawlDecision) -> Self {
        self.queue.write().unwrap().push_back(decision);
        self
    }

    pub fn contexts(&self) -> Vec<ContextSnapshot> {
        self.contexts.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.contexts.read().unwrap().len()
    }
}

#[async_trait]
impl DecisionMaker for MockDecisionMaker {
    async fn decide(&self, context: &DecisionContext<'_>) -> Result<CrawlDecision> {
        self.contexts
            .write()
            .unwrap()
            .push(ContextSnapshot::capture(context));

        if let Some(decision) = self.queue.write().unwrap().pop_front() {
            return Ok(decision);
        }
        if let Some(decide) = &self.decide_fn {
            return decide(context);
        }
        self.always
            .clone()
            .ok_or_else(|| EnrichmentError::Llm("mock: no decision configured".into()))
    }
}

/// A mock web searcher.
#[derive(Clone, Default)]
pub struct MockSearcher {
    hits: Arc<RwLock<Vec<SearchHit>>>,
    failing: bool,
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockSearcher {
    /// Returns no hits unless configured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn with_hits(self, hits: Vec<SearchHit>) -> Self {
        *self.hits.write().unwrap() = hits;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.read().unwrap().len()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.queries.write().unwrap().push(query.to_string());

        if self.failing {
            return Err(EnrichmentError::Search("mock: search unavailable".into()));
        }
        Ok(self.hits.read().unwrap().clone())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_probe_repeats_last_get() {
        let probe = MockProbe::new()
            .get_status("https://a.example", 429, "")
            .get_status("https://a.example", 200, "ok");

        assert_eq!(probe.get("https://a.example").await.unwrap().status, 429);
        assert_eq!(probe.get("https://a.example").await.unwrap().status, 200);
        assert_eq!(probe.get("https://a.example").await.unwrap().status, 200);
        assert!(probe.head("https://a.example").await.is_err());
        assert_eq!(probe.call_count(), 4);
    }

    #[tokio::test]
    async fn test_mock_decision_maker_queue_then_always() {
        let maker = MockDecisionMaker::always(CrawlDecision::stop()).then(CrawlDecision::aggregate());
        let description = crate::types::perk::FieldValue::NotFound;
        let context = DecisionContext {
            record_name: "Acme",
            original_description: &description,
            accumulated: &[],
            last_page: None,
            depth: 0,
            max_depth: 3,
            search_performed: false,
        };

        assert_eq!(maker.decide(&context).await.unwrap(), CrawlDecision::aggregate());
        assert_eq!(maker.decide(&context).await.unwrap(), CrawlDecision::stop());
        assert_eq!(maker.contexts()[0].record_name, "Acme");
    }
}
