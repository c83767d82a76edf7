//! URL liveness classification.
//!
//! A raw status code is not trusted on its own. Pages that answer 200
//! are checked for error or closed-form content, and access errors
//! (401/403/405) get a second opinion from a headless browser.
//!
//! Flow for a normalised URL:
//! 1. HEAD. Success still fetches the body with GET for the content check.
//! 2. HEAD failure or >= 400 falls through to GET (429 retried).
//! 3. 404 and other 4xx/5xx are dead, except 401/403/405 which go to
//!    the browser fallback.
//! 4. Transport failure of every strategy is `Unknown`.

mod heuristics;
mod link;

use std::sync::Arc;
use tracing::{debug, info, warn};

pub use heuristics::KeywordClassifier;
pub use link::{is_email, normalize_url};

use crate::error::{FetchError, FetchResult};
use crate::html;
use crate::retry::RetryPolicy;
use crate::traits::{
    extractor::PageClassifier,
    fetcher::{BrowserFetcher, HttpProbe},
};
use crate::types::{config::LivenessConfig, page::ProbeResponse, record::LivenessVerdict};

/// Statuses that suggest bot protection rather than a missing page.
const ACCESS_STATUSES: [u16; 3] = [401, 403, 405];

/// Decides whether a record's link is really alive.
pub struct LivenessClassifier {
    probe: Arc<dyn HttpProbe>,
    browser: Option<Arc<dyn BrowserFetcher>>,
    page_classifier: Option<Arc<dyn PageClassifier>>,
    heuristic: KeywordClassifier,
    retry: RetryPolicy,
}

impl LivenessClassifier {
    pub fn new(probe: Arc<dyn HttpProbe>, config: &LivenessConfig) -> Self {
        Self {
            probe,
            browser: None,
            page_classifier: None,
            heuristic: KeywordClassifier::from_config(config),
            retry: RetryPolicy::default(),
        }
    }

    /// Browser used for access errors and total network failure.
    pub fn with_browser(mut self, browser: Arc<dyn BrowserFetcher>) -> Self {
        self.browser = Some(browser);
        self
    }

    /// LLM judge asked before the keyword heuristic.
    pub fn with_page_classifier(mut self, classifier: Arc<dyn PageClassifier>) -> Self {
        self.page_classifier = Some(classifier);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Classify a stored link. Never fails; ambiguity is `Unknown`.
    pub async fn classify(&self, link: Option<&str>) -> LivenessVerdict {
        let Some(raw) = link.map(str::trim).filter(|l| !l.is_empty()) else {
            debug!("No link to classify");
            return LivenessVerdict::NoUrl;
        };

        if is_email(raw) {
            debug!(link = %raw, "Link is an email address");
            return LivenessVerdict::IsEmail;
        }

        let url = normalize_url(raw);
        let verdict = self.classify_url(&url).await;
        info!(url = %url, verdict = %verdict, "Classified link");
        verdict
    }

    async fn classify_url(&self, url: &str) -> LivenessVerdict {
        let head = self.probe.head(url).await;

        let response = match head {
            Ok(head) if !head.is_error() => {
                debug!(url = %url, status = head.status, "HEAD ok, fetching body");
                match self.get(url).await {
                    Ok(get) => get,
                    Err(e) => {
                        debug!(url = %url, error = %e, "GET after HEAD failed, keeping HEAD result");
                        return LivenessVerdict::Alive;
                    }
                }
            }
            other => {
                match &other {
                    Ok(head) => debug!(url = %url, status = head.status, "HEAD error status, retrying with GET"),
                    Err(e) => debug!(url = %url, error = %e, "HEAD failed, retrying with GET"),
                }
                match self.get(url).await {
                    Ok(get) => get,
                    Err(FetchError::RateLimited { .. }) => {
                        warn!(url = %url, "Still rate limited after retries");
                        return LivenessVerdict::Unknown;
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "GET failed, trying browser");
                        return self.browser_fallback(url).await;
                    }
                }
            }
        };

        self.classify_response(url, response).await
    }

    /// GET with 429 answers turned into retryable errors.
    async fn get(&self, url: &str) -> FetchResult<ProbeResponse> {
        self.retry
            .run("probe GET", move || async move {
                let response = self.probe.get(url).await?;
                if response.status == 429 {
                    Err(FetchError::RateLimited {
                        url: url.to_string(),
                    })
                } else {
                    Ok(response)
                }
            })
            .await
    }

    async fn classify_response(&self, url: &str, response: ProbeResponse) -> LivenessVerdict {
        match response.status {
            404 => LivenessVerdict::Dead,
            status if ACCESS_STATUSES.contains(&status) => {
                info!(url = %url, status, "Access issue, trying browser");
                self.browser_fallback(url).await
            }
            400..=599 => LivenessVerdict::Dead,
            _ => {
                if self.content_unavailable(&response.body).await {
                    info!(url = %url, "Page answered OK but shows an error or closed form");
                    LivenessVerdict::Dead
                } else {
                    LivenessVerdict::Alive
                }
            }
        }
    }

    async fn browser_fallback(&self, url: &str) -> LivenessVerdict {
        let Some(browser) = &self.browser else {
            debug!(url = %url, "No browser configured");
            return LivenessVerdict::Unknown;
        };

        match browser.render(url).await {
            Ok(page) => {
                if self.content_unavailable(&page.html).await {
                    LivenessVerdict::Dead
                } else {
                    LivenessVerdict::Alive
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Browser fetch failed");
                LivenessVerdict::Unknown
            }
        }
    }

    /// Content check for pages that answered with a success status.
    async fn content_unavailable(&self, page_html: &str) -> bool {
        if page_html.trim().is_empty() {
            return false;
        }

        if let Some(classifier) = &self.page_classifier {
            let text = html::html_to_markdown(page_html);
            match classifier.is_unavailable(&text).await {
                Ok(unavailable) => return unavailable,
                Err(e) => warn!(error = %e, "Page classifier failed, using keyword heuristic"),
            }
        }

        self.heuristic.is_error_page(page_html)
    }
}
