//! Plain HTTP page fetcher.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PageFetcher;
use crate::types::{config::BROWSER_USER_AGENT, page::PageContent};

use super::page_from_html;

/// Fetches a page with a single GET and renders its HTML as markdown.
///
/// No JavaScript. For script-heavy or bot-protected sites, put a
/// browser or Firecrawl fetcher behind it with `FallbackFetcher`.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        let target = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(target).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            FetchError::from_reqwest(url, e)
        })?;

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

        // Relative links resolve against the post-redirect URL
        let final_url = response.url().to_string();
        let raw_html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let page = page_from_html(&final_url, &raw_html);
        if page.is_empty() {
            return Err(FetchError::EmptyContent {
                url: url.to_string(),
            });
        }
        Ok(page)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_url_is_rejected_before_request() {
        let fetcher = HttpPageFetcher::new().unwrap();

        let err = fetcher.fetch("acme dot example").await.unwrap_err();

        assert!(matches!(err, FetchError::InvalidUrl { ref url } if url == "acme dot example"));
    }
}
