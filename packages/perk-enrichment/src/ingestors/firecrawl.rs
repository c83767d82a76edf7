//! Firecrawl-based page fetcher.
//!
//! Uses the Firecrawl scrape API for JavaScript-heavy sites with
//! anti-bot protection. Requires the `firecrawl` feature.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::retry::RetryPolicy;
use crate::security::ServiceCredentials;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::PageContent;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";

/// Page fetcher backed by Firecrawl's `/v1/scrape`.
///
/// # Example
///
/// ```rust,ignore
/// use perk_enrichment::ingestors::FirecrawlFetcher;
/// use perk_enrichment::security::ServiceCredentials;
///
/// let fetcher = FirecrawlFetcher::new(ServiceCredentials::new(api_key))?;
/// let page = fetcher.fetch("https://example.com/perks").await?;
/// ```
pub struct FirecrawlFetcher {
    client: Client,
    credentials: ServiceCredentials,
    retry: RetryPolicy,
}

// Request/Response types for Firecrawl API

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
    #[serde(rename = "onlyMainContent")]
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ScrapeData {
    markdown: Option<String>,
    #[serde(default)]
    links: Vec<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
struct PageMetadata {
    title: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
}

impl FirecrawlFetcher {
    pub fn new(credentials: ServiceCredentials) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn scrape(&self, url: &str) -> FetchResult<ScrapeResponse> {
        let endpoint = format!("{}/v1/scrape", self.credentials.base_url_or(FIRECRAWL_API_URL));
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(self.credentials.api_key.expose())
            .json(&ScrapeRequest {
                url,
                formats: ["markdown", "links"],
                only_main_content: true,
            })
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))
    }
}

fn into_page(url: &str, response: ScrapeResponse) -> FetchResult<PageContent> {
    if !response.success {
        return Err(FetchError::Http(
            format!(
                "Firecrawl scrape failed: {}",
                response.error.unwrap_or_else(|| "unknown error".to_string())
            )
            .into(),
        ));
    }

    let data = response.data.ok_or_else(|| FetchError::EmptyContent {
        url: url.to_string(),
    })?;
    let markdown = data.markdown.unwrap_or_default();
    if markdown.trim().is_empty() {
        return Err(FetchError::EmptyContent {
            url: url.to_string(),
        });
    }

    let (title, source_url) = match data.metadata {
        Some(meta) => (meta.title, meta.source_url),
        None => (None, None),
    };

    let page = PageContent::new(source_url.unwrap_or_else(|| url.to_string()), markdown)
        .with_links(data.links);
    Ok(match title {
        Some(title) => page.with_title(title),
        None => page,
    })
}

#[async_trait]
impl PageFetcher for FirecrawlFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        let response = self.retry.run("firecrawl scrape", || self.scrape(url)).await?;
        let page = into_page(url, response)?;
        debug!(url = %url, chars = page.content.len(), links = page.links.len(), "Firecrawl scraped page");
        Ok(page)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
