//! Link normalisation and email detection.

use regex::Regex;
use std::sync::LazyLock;

static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// True for a bare email address (the whole string, trimmed).
pub fn is_email(value: &str) -> bool {
    RE_EMAIL.is_match(value.trim())
}

/// Prefix `http://` when the link carries no scheme.
pub fn normalize_url(value: &str) -> String {
    let trimmed = value.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
