//! Perk Record Enrichment Library
//!
//! Checks whether each perk record's link still leads to a live offer,
//! crawls live sites under LLM guidance to fill in the perk fields, and
//! reconciles per-page extractions into one record per perk.
//!
//! # Design Philosophy
//!
//! - Sentinels, not errors: a missing field is `Not found`, a bot wall is
//!   `Blocked`, an unreadable LLM reply is `Error parsing`
//! - Every external service sits behind a trait
//! - The engine never invents a value the pages did not contain
//!
//! # Usage
//!
//! ```rust,ignore
//! use perk_enrichment::{BatchConfig, BatchRunner, CrawlAndDecide, LivenessClassifier};
//! use perk_enrichment::testing::{MockDecisionMaker, MockExtractor, MockFetcher, MockProbe};
//! use perk_enrichment::stores::MemoryStore;
//!
//! let liveness = LivenessClassifier::new(Arc::new(MockProbe::new()), &LivenessConfig::default());
//! let crawler = CrawlAndDecide::new(
//!     Arc::new(MockFetcher::new()),
//!     Arc::new(MockExtractor::new()),
//!     Arc::new(MockDecisionMaker::new()),
//! );
//!
//! let report = BatchRunner::new(Arc::new(MemoryStore::new()), liveness, BatchConfig::default())
//!     .with_crawler(crawler)
//!     .run()
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`liveness`] - URL normalization and link liveness verdicts
//! - [`extract`] - LLM field extraction, crawl decisions, page classification
//! - [`crawl`] - The bounded crawl-and-decide loop
//! - [`merge`] - Reconciling per-page extractions
//! - [`pipeline`] - Batch runner and store column mapping
//! - [`stores`] - Record stores (MemoryStore, AirtableStore)
//! - [`ingestors`] - Page fetchers and the liveness probe
//! - [`snapshot`] - Per-run working files
//! - [`testing`] - Mock implementations for testing

pub mod crawl;
pub mod error;
pub mod extract;
pub mod html;
pub mod ingestors;
pub mod liveness;
pub mod merge;
pub mod pipeline;
pub mod retry;
pub mod security;
pub mod snapshot;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(any(feature = "openai", feature = "exa"))]
pub mod ai;

// Re-export core types at crate root
pub use error::{EnrichmentError, FetchError, Retryable, SecurityError};
pub use traits::{
    extractor::{DecisionMaker, FieldExtractor, PageClassifier},
    fetcher::{BrowserFetcher, HttpProbe, PageFetcher},
    llm::{CompletionRequest, LanguageModel},
    searcher::{hits_to_text, WebSearcher},
    store::{FieldMap, RecordStore},
};
pub use types::{
    config::{BatchConfig, CrawlConfig, ExtractorConfig, LivenessConfig, MonetaryStrategy, StatusPolicy},
    decision::{CrawlAction, CrawlDecision, DecisionContext},
    page::{PageContent, ProbeResponse, RenderedPage, SearchHit},
    perk::{FieldValue, FinalPerkRecord, PartialPerkRecord, PerkField},
    record::{InputRecord, LivenessVerdict, RecordStatus},
};

// Re-export engine components
pub use crawl::{CrawlAndDecide, CrawlOutcome, CrawlState, TerminalAction, Termination};
pub use extract::{LlmDecisionMaker, LlmFieldExtractor, LlmPageClassifier};
pub use liveness::{is_email, normalize_url, KeywordClassifier, LivenessClassifier};
pub use merge::{merge, merge_with};
pub use pipeline::{BatchReport, BatchRunner, BatchSummary};
pub use retry::RetryPolicy;
pub use security::{SecretString, ServiceCredentials, UrlValidator};
pub use snapshot::{Snapshot, SnapshotWriter};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "airtable")]
pub use stores::AirtableStore;

// Re-export ingestors
pub use ingestors::{FallbackFetcher, HttpPageFetcher, RateLimitedFetcher, ReqwestProbe};

#[cfg(feature = "firecrawl")]
pub use ingestors::FirecrawlFetcher;

#[cfg(feature = "browserless")]
pub use ingestors::{BrowserPageFetcher, BrowserlessClient};

#[cfg(feature = "openai")]
pub use ai::{OpenAiChat, PerplexitySearcher};

#[cfg(feature = "exa")]
pub use ai::ExaSearcher;

// Re-export testing utilities
pub use testing::{MockDecisionMaker, MockExtractor, MockFetcher, MockLanguageModel, MockProbe};
