//! Headless browser via a Browserless `/function` endpoint.
//!
//! The page is loaded with puppeteer, the first button or link whose
//! text matches a consent pattern is clicked, and the page is scrolled
//! once so lazy content loads. Requires the `browserless` feature.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::security::SecretString;
use crate::traits::fetcher::{BrowserFetcher, PageFetcher};
use crate::types::page::{PageContent, RenderedPage};

use super::page_from_html;

/// Consent button texts, matched case-insensitively as substrings.
pub const CONSENT_PATTERNS: [&str; 4] = ["Accept", "Accept All", "I Accept", "Agree"];

const RENDER_SCRIPT: &str = r#"export default async function ({ page, context }) {
  await page.goto(context.url, { waitUntil: "networkidle2", timeout: context.timeoutMs });
  const patterns = context.patterns.map((p) => p.toLowerCase());
  const candidates = await page.$$("button, a, [role=button]");
  for (const el of candidates) {
    const text = ((await page.evaluate((node) => node.innerText || "", el)) || "").trim().toLowerCase();
    if (text && patterns.some((p) => text.includes(p))) {
      await el.click().catch(() => {});
      await new Promise((r) => setTimeout(r, 1000));
      break;
    }
  }
  await page.keyboard.press("Escape").catch(() => {});
  await page.evaluate(() => window.scrollTo(0, document.body.scrollHeight));
  await new Promise((r) => setTimeout(r, 1000));
  return { data: await page.content(), type: "text/html" };
}"#;

#[derive(Serialize)]
struct FunctionRequest<'a> {
    code: &'static str,
    context: FunctionContext<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionContext<'a> {
    url: &'a str,
    patterns: &'a [&'static str],
    timeout_ms: u64,
}

/// Browserless client implementing [`BrowserFetcher`].
pub struct BrowserlessClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
    navigation_timeout: Duration,
}

impl BrowserlessClient {
    pub fn new(base_url: impl Into<String>) -> FetchResult<Self> {
        let navigation_timeout = Duration::from_secs(30);
        let client = Client::builder()
            // Navigation plus consent handling and scrolling
            .timeout(navigation_timeout + Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            navigation_timeout,
        })
    }

    pub fn with_token(mut self, token: impl Into<SecretString>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl BrowserFetcher for BrowserlessClient {
    async fn render(&self, url: &str) -> FetchResult<RenderedPage> {
        let mut request = self
            .client
            .post(format!("{}/function", self.base_url))
            .json(&FunctionRequest {
                code: RENDER_SCRIPT,
                context: FunctionContext {
                    url,
                    patterns: &CONSENT_PATTERNS,
                    timeout_ms: self.navigation_timeout.as_millis() as u64,
                },
            });
        if let Some(token) = &self.token {
            request = request.query(&[("token", token.expose())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        if html.trim().is_empty() {
            return Err(FetchError::EmptyContent {
                url: url.to_string(),
            });
        }

        debug!(url = %url, bytes = html.len(), "Browser rendered page");
        Ok(RenderedPage::new(url, html))
    }
}

/// Adapts any [`BrowserFetcher`] into a [`PageFetcher`].
pub struct BrowserPageFetcher<B: BrowserFetcher> {
    browser: B,
}

impl<B: BrowserFetcher> BrowserPageFetcher<B> {
    pub fn new(browser: B) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl<B: BrowserFetcher> PageFetcher for BrowserPageFetcher<B> {
    async fn fetch(&self, url: &str) -> FetchResult<PageContent> {
        let rendered = self.browser.render(url).await?;
        let page = page_from_html(&rendered.url, &rendered.html);
        if page.is_empty() {
            return Err(FetchError::EmptyContent {
                url: url.to_string(),
            });
        }
        Ok(page)
    }

    fn name(&self) -> &str {
        "browser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBrowser;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(FunctionRequest {
            code: RENDER_SCRIPT,
            context: FunctionContext {
                url: "https://acme.example",
                patterns: &CONSENT_PATTERNS,
                timeout_ms: 30000,
            },
        })
        .unwrap();

        assert_eq!(body["context"]["url"], "https://acme.example");
        assert_eq!(body["context"]["timeoutMs"], 30000);
        assert_eq!(body["context"]["patterns"][1], "Accept All");
        assert!(body["code"].as_str().unwrap().contains("page.content()"));
    }

    #[tokio::test]
    async fn test_browser_page_fetcher() {
        let browser = MockBrowser::new().with_page(
            "https://acme.example",
            "<title>Acme</title><p>Startup credits</p>",
        );
        let fetcher = BrowserPageFetcher::new(browser);

        let page = fetcher.fetch("https://acme.example").await.unwrap();
        assert_eq!(page.title.as_deref(), Some("Acme"));
        assert!(page.content.contains("Startup credits"));

        assert!(fetcher.fetch("https://other.example").await.is_err());
    }
}
