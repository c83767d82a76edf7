//! Two-stage fetcher: try one strategy, then another.

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchResult;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::PageContent;

/// Tries `primary`, then `secondary` when the primary fails.
///
/// Typical use is plain HTTP first and a browser or scraping API second.
pub struct FallbackFetcher<A: PageFetcher, B: PageFetcher> {
    primary: A,
    secondary: B,
}

impl<A: PageFetcher, B: PageFetcher> FallbackFetcher<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<A: PageFetcher, B: PageFetcher> PageFetcher for FallbackFetcher<A, B> {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        match self.primary.fetch(url).await {
            Ok(page) if !page.is_empty() => Ok(page),
            Ok(_) => {
                debug!(url = %url, primary = self.primary.name(), "Primary returned no content, falling back");
                self.secondary.fetch(url).await
            }
            Err(e) => {
                debug!(url = %url, primary = self.primary.name(), error = %e, "Primary failed, falling back");
                self.secondary.fetch(url).await
            }
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let primary = MockFetcher::new().with_page("https://a.example", "primary");
        let secondary = MockFetcher::new()
            .with_page("https://a.example", "secondary")
            .with_page("https://b.example", "secondary b");
        let fetcher = FallbackFetcher::new(primary.clone(), secondary.clone());

        let a = fetcher.fetch("https://a.example").await.unwrap();
        assert_eq!(a.content, "primary");
        assert_eq!(secondary.call_count(), 0);

        let b = fetcher.fetch("https://b.example").await.unwrap();
        assert_eq!(b.content, "secondary b");

        assert!(fetcher.fetch("https://c.example").await.is_err());
        assert_eq!(primary.call_count(), 3);
        assert_eq!(secondary.call_count(), 2);
    }
}
