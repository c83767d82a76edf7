//! Fetching traits: raw HTTP probes, headless browsers and page fetchers.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::types::page::{PageContent, ProbeResponse, RenderedPage};

/// Plain HTTP probe used by liveness classification.
///
/// Implementations follow redirects. A 4xx/5xx answer is an `Ok`
/// response; only transport failures are errors.
#[async_trait]
pub trait HttpProbe: Send + Sync {
    /// Lightweight HEAD request.
    async fn head(&self, url: &str) -> FetchResult<ProbeResponse>;

    /// Full GET request, body included.
    async fn get(&self, url: &str) -> FetchResult<ProbeResponse>;
}

/// Headless browser that renders JavaScript and dismisses consent banners.
#[async_trait]
pub trait BrowserFetcher: Send + Sync {
    async fn render(&self, url: &str) -> FetchResult<RenderedPage>;
}

#[async_trait]
impl<T: BrowserFetcher + ?Sized> BrowserFetcher for Arc<T> {
    async fn render(&self, url: &str) -> FetchResult<RenderedPage> {
        (**self).render(url).await
    }
}

/// Fetches page content for extraction.
///
/// The crawl loop does not care whether content came from plain HTTP,
/// a scraping API or a browser.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Lets a shared or type-erased fetcher sit inside the generic wrappers.
#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
