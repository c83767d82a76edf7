//! Integration tests for the crawl-and-decide loop.
//!
//! These exercise the loop through the public API only:
//! 1. Budget: the first page plus at most `max_depth` follow-ups
//! 2. One web search per record, however often it is requested
//! 3. Records without a link never touch a collaborator

use std::sync::Arc;

use perk_enrichment::{
    testing::MockSearcher, CrawlAndDecide, CrawlConfig, CrawlDecision, FieldValue, InputRecord,
    MockDecisionMaker, MockExtractor, MockFetcher, PartialPerkRecord, PerkField, SearchHit,
    Termination,
};

/// Helper to build a crawler from shared mocks.
fn crawler(fetcher: &MockFetcher, extractor: &MockExtractor, decider: &MockDecisionMaker) -> CrawlAndDecide {
    CrawlAndDecide::new(
        Arc::new(fetcher.clone()),
        Arc::new(extractor.clone()),
        Arc::new(decider.clone()),
    )
}

/// A site with a root page and `pages` numbered subpages.
fn site(pages: usize) -> MockFetcher {
    (1..=pages).fold(
        MockFetcher::new().with_page("https://acme.example", "Acme home"),
        |fetcher, n| fetcher.with_page(format!("https://acme.example/p{}", n), format!("Acme page {}", n)),
    )
}

#[tokio::test]
async fn test_depth_budget_bounds_fetches() {
    let fetcher = site(10);
    let extractor = MockExtractor::new();
    // Always asks for a fresh page
    let decider = MockDecisionMaker::with_fn(|context| {
        Ok(CrawlDecision::scrape_further([format!("/p{}", context.depth + 1)]))
    });

    let outcome = crawler(&fetcher, &extractor, &decider)
        .with_config(CrawlConfig::default().with_max_depth(3))
        .run(&InputRecord::new("r1", "Acme").with_url("https://acme.example"))
        .await;

    assert_eq!(fetcher.call_count(), 4);
    assert_eq!(outcome.depth, 3);
    assert_eq!(outcome.termination, Termination::MaxDepth);
    assert_eq!(
        fetcher.urls(),
        vec![
            "https://acme.example",
            "https://acme.example/p1",
            "https://acme.example/p2",
            "https://acme.example/p3",
        ]
    );

    // The decision maker is never asked once the budget is spent
    assert_eq!(decider.call_count(), 3);
    assert!(decider.contexts().iter().all(|c| c.depth < c.max_depth));
    assert_eq!(outcome.accumulated.len(), 4);
}

#[tokio::test]
async fn test_zero_depth_scrapes_only_the_link() {
    let fetcher = site(2);
    let decider = MockDecisionMaker::always(CrawlDecision::scrape_further(["/p1"]));

    let outcome = crawler(&fetcher, &MockExtractor::new(), &decider)
        .with_config(CrawlConfig::default().with_max_depth(0))
        .run(&InputRecord::new("r1", "Acme").with_url("https://acme.example"))
        .await;

    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(decider.call_count(), 0);
    assert_eq!(outcome.depth, 0);
}

#[tokio::test]
async fn test_search_runs_at_most_once() {
    let fetcher = site(0);
    let extractor = MockExtractor::new().with_default(
        PartialPerkRecord::not_found().with_field(PerkField::MonetaryValue, "$2,000"),
    );
    let decider = MockDecisionMaker::always(CrawlDecision::search_web("acme startup credits"));
    let searcher = MockSearcher::new().with_hits(vec![
        SearchHit::new("Acme offers $2,000 in credits").with_source("https://news.example/acme")
    ]);

    let outcome = crawler(&fetcher, &extractor, &decider)
        .with_searcher(Arc::new(searcher.clone()))
        .run(&InputRecord::new("r1", "Acme").with_url("https://acme.example"))
        .await;

    assert!(outcome.search_performed);
    assert_eq!(outcome.termination, Termination::Searched);
    assert_eq!(searcher.queries(), vec!["acme startup credits".to_string()]);
    assert_eq!(outcome.merged.monetary_value, FieldValue::found("$2,000"));
}

#[tokio::test]
async fn test_failed_search_still_counts() {
    let fetcher = site(0);
    let decider = MockDecisionMaker::always(CrawlDecision::search_web("acme perks"));
    let searcher = MockSearcher::failing();

    let outcome = crawler(&fetcher, &MockExtractor::new(), &decider)
        .with_searcher(Arc::new(searcher.clone()))
        .run(&InputRecord::new("r1", "Acme").with_url("https://acme.example"))
        .await;

    assert!(outcome.search_performed);
    assert_eq!(searcher.call_count(), 1);
    assert_eq!(outcome.merged, PartialPerkRecord::not_found());
}

#[tokio::test]
async fn test_record_without_link_makes_no_calls() {
    let fetcher = site(1);
    let extractor = MockExtractor::new();
    let decider = MockDecisionMaker::always(CrawlDecision::aggregate());
    let searcher = MockSearcher::new();

    let outcome = crawler(&fetcher, &extractor, &decider)
        .with_searcher(Arc::new(searcher.clone()))
        .run(&InputRecord::new("r1", "Acme").with_url("   "))
        .await;

    assert_eq!(outcome.termination, Termination::NoUrl);
    assert_eq!(outcome.merged, PartialPerkRecord::not_found());
    assert!(outcome.visited.is_empty());
    assert_eq!(fetcher.call_count(), 0);
    assert_eq!(extractor.call_count(), 0);
    assert_eq!(decider.call_count(), 0);
    assert_eq!(searcher.call_count(), 0);
    assert!(!outcome.search_performed);
}
