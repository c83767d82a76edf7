//! Page types - scraped content, probe responses and search hits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Scraped text for one URL.
///
/// Lives for one extraction pass; only the URL outlives it (in the
/// visited list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    /// URL the content came from
    pub url: String,

    /// Page content (usually markdown)
    pub content: String,

    /// Page title if available
    pub title: Option<String>,

    /// Absolute links found on the page
    #[serde(default)]
    pub links: Vec<String>,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,

    /// SHA-256 hash of the content
    pub content_hash: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = Self::hash_content(&content);

        Self {
            url: url.into(),
            content,
            title: None,
            links: Vec::new(),
            fetched_at: Utc::now(),
            content_hash,
        }
    }

    /// Calculate SHA-256 hash of content.
    pub fn hash_content(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// True when there is no non-whitespace content.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Result of a plain HTTP probe. Error statuses are responses, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,

    /// URL after redirects
    pub final_url: String,

    /// Body text (empty for HEAD)
    pub body: String,
}

impl ProbeResponse {
    pub fn new(status: u16, final_url: impl Into<String>) -> Self {
        Self {
            status,
            final_url: final_url.into(),
            body: String::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// HTML produced by a headless browser after consent handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

impl RenderedPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Answer or snippet text
    pub text: String,

    /// Where the text came from, if the provider says
    pub source_url: Option<String>,
}

impl SearchHit {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_url: None,
        }
    }

    pub fn with_source(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = PageContent::new("https://a.example", "hello");
        let b = PageContent::new("https://b.example", "hello");
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_empty_content() {
        assert!(PageContent::new("https://a.example", " \n\t").is_empty());
        assert!(!PageContent::new("https://a.example", "x").is_empty());
    }
}
