//! Fetcher implementations for probing and scraping pages.
//!
//! # Available Fetchers
//!
//! - `ReqwestProbe` - HEAD/GET probe for liveness checks
//! - `HttpPageFetcher` - Plain HTTP GET with HTML to markdown
//! - `FirecrawlFetcher` - Firecrawl scrape API (requires `firecrawl` feature)
//! - `BrowserlessClient` / `BrowserPageFetcher` - Headless browser (requires `browserless` feature)
//! - `RateLimitedFetcher` - Wraps any fetcher with a request quota
//! - `FallbackFetcher` - Tries a second fetcher when the first fails

mod fallback;
mod http;
mod probe;
mod rate_limited;

#[cfg(feature = "firecrawl")]
mod firecrawl;

#[cfg(feature = "browserless")]
mod browserless;

pub use fallback::FallbackFetcher;
pub use http::HttpPageFetcher;
pub use probe::ReqwestProbe;
pub use rate_limited::RateLimitedFetcher;

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlFetcher;

#[cfg(feature = "browserless")]
pub use browserless::{BrowserPageFetcher, BrowserlessClient, CONSENT_PATTERNS};

use crate::html;
use crate::types::page::PageContent;
use url::Url;

/// Build page content from raw HTML: markdown body, title and links.
pub(crate) fn page_from_html(url: &str, raw_html: &str) -> PageContent {
    let links = Url::parse(url)
        .map(|base| html::extract_links(&base, raw_html))
        .unwrap_or_default();
    let page = PageContent::new(url, html::html_to_markdown(raw_html)).with_links(links);

    match html::extract_title(raw_html) {
        Some(title) => page.with_title(title),
        None => page,
    }
}
