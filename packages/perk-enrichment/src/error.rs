//! Typed errors for the enrichment library.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Engine operations
//! absorb most of these into sentinel values; they surface only at the
//! collaborator seams and in the batch runner.

use thiserror::Error;

/// Errors that can occur while enriching records.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Page fetch failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// LLM service unavailable or returned an unusable response
    #[error("LLM error: {0}")]
    Llm(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Record store operation failed
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Web search failed
    #[error("search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Snapshot file could not be read or written
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external API answered 429
    #[error("rate limited by {service}")]
    RateLimited { service: String },

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors that can occur while fetching a single URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation failed
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Connection or read timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Host answered 429
    #[error("rate limited: {url}")]
    RateLimited { url: String },

    /// Page fetched but nothing usable came back
    #[error("no content at: {url}")]
    EmptyContent { url: String },
}

impl FetchError {
    /// Map a reqwest error, keeping timeouts distinguishable.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http(Box::new(err))
        }
    }
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Marks errors that a [`crate::retry::RetryPolicy`] may retry.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for EnrichmentError {
    fn is_retryable(&self) -> bool {
        match self {
            EnrichmentError::RateLimited { .. } => true,
            EnrichmentError::Fetch(inner) => inner.is_retryable(),
            _ => false,
        }
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Result type alias for enrichment operations.
pub type Result<T> = std::result::Result<T, EnrichmentError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limits_are_retryable() {
        assert!(EnrichmentError::RateLimited {
            service: "openai".into()
        }
        .is_retryable());
        assert!(FetchError::RateLimited {
            url: "https://a.example".into()
        }
        .is_retryable());
        assert!(EnrichmentError::Fetch(FetchError::RateLimited {
            url: "https://a.example".into()
        })
        .is_retryable());

        assert!(!FetchError::Status {
            url: "https://a.example".into(),
            status: 500
        }
        .is_retryable());
        assert!(!EnrichmentError::Cancelled.is_retryable());
    }

    #[test]
    fn test_status_display() {
        let err = FetchError::Status {
            url: "https://a.example".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://a.example");
    }
}
