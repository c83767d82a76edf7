//! Configuration types for classification, extraction, crawling and batches.

use serde::{Deserialize, Serialize};

/// Browser-like User-Agent sent with probes.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/112.0.0.0 Safari/537.36";

/// Configuration for liveness classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// HEAD request timeout. Default: 5.
    pub head_timeout_secs: u64,

    /// GET request timeout. Default: 10.
    pub get_timeout_secs: u64,

    pub user_agent: String,

    /// Keywords looked for in `<title>` and `<h1>`
    pub error_keywords: Vec<String>,

    /// Substrings of `class` attributes marking an error container
    pub error_class_keywords: Vec<String>,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            head_timeout_secs: 5,
            get_timeout_secs: 10,
            user_agent: BROWSER_USER_AGENT.to_string(),
            error_keywords: ["404", "page not found", "not found", "error"]
                .into_iter()
                .map(String::from)
                .collect(),
            error_class_keywords: ["error-page", "not-found", "404"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl LivenessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head_timeout(mut self, secs: u64) -> Self {
        self.head_timeout_secs = secs;
        self
    }

    pub fn with_get_timeout(mut self, secs: u64) -> Self {
        self.get_timeout_secs = secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Configuration for the LLM field extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Input beyond this many characters is truncated. Default: 15000.
    pub max_input_chars: usize,

    /// Default: 0.2.
    pub temperature: f32,

    /// Case-insensitive substrings that mark a bot-blocked page
    pub blocking_keywords: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 15_000,
            temperature: 0.2,
            blocking_keywords: [
                "blocked",
                "access denied",
                "forbidden",
                "403",
                "captcha",
                "not authorized",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_input_chars(mut self, chars: usize) -> Self {
        self.max_input_chars = chars;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Configuration for the crawl-and-decide loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Extra pages beyond the first. Default: 3.
    pub max_depth: usize,

    /// Search once for fields still missing at aggregation. Default: true.
    pub gap_search: bool,

    /// Candidate URLs considered per `scrape_further`. Default: 10.
    pub max_candidate_urls: usize,

    /// Last-page characters shown to the decision maker. Default: 4000.
    pub max_context_chars: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            gap_search: true,
            max_candidate_urls: 10,
            max_context_chars: 4000,
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_gap_search(mut self, enabled: bool) -> Self {
        self.gap_search = enabled;
        self
    }

    pub fn with_max_candidate_urls(mut self, count: usize) -> Self {
        self.max_candidate_urls = count;
        self
    }
}

/// How the monetary field is reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonetaryStrategy {
    /// Keep the text; prefer candidates carrying a currency symbol
    #[default]
    PreferCurrency,

    /// Reduce to the digits of the preferred candidate
    Numeric,
}

/// Maps verdicts onto store statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPolicy {
    /// Write `broken/expired` for `Unknown`. Default: true.
    pub unknown_as_broken: bool,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            unknown_as_broken: true,
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pause between records. Default: 1000.
    pub inter_record_delay_ms: u64,

    /// Crawl and extract for live records. Default: true.
    pub enrich: bool,

    /// Compute everything but write nothing back. Default: false.
    pub dry_run: bool,

    /// Do not re-probe records already marked broken. Default: false.
    pub skip_broken: bool,

    /// Process at most this many records
    pub limit: Option<usize>,

    pub status_policy: StatusPolicy,

    pub monetary_strategy: MonetaryStrategy,

    /// Column that receives the update timestamp, if the table has one
    pub last_edited_field: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            inter_record_delay_ms: 1000,
            enrich: true,
            dry_run: false,
            skip_broken: false,
            limit: None,
            status_policy: StatusPolicy::default(),
            monetary_strategy: MonetaryStrategy::default(),
            last_edited_field: None,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.inter_record_delay_ms = ms;
        self
    }

    pub fn with_enrich(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_skip_broken(mut self, skip: bool) -> Self {
        self.skip_broken = skip;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_monetary_strategy(mut self, strategy: MonetaryStrategy) -> Self {
        self.monetary_strategy = strategy;
        self
    }

    pub fn with_last_edited_field(mut self, field: impl Into<String>) -> Self {
        self.last_edited_field = Some(field.into());
        self
    }
}
