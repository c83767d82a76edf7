//! URL validation for crawl candidates.
//!
//! Links proposed by the decision maker are untrusted model output. They
//! are resolved against the page they came from and checked before any
//! request is made.

use std::collections::HashSet;
use std::net::IpAddr;
use url::Url;

use crate::error::{SecurityError, SecurityResult};

/// SSRF guard for candidate URLs.
///
/// Rejects:
/// - Non-HTTP(S) schemes (mailto:, javascript:, file://)
/// - Loopback and metadata hostnames
/// - Literal IPs in private, loopback and link-local ranges
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<ipnet::IpNet>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    pub fn new() -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: [
                "localhost",
                "0.0.0.0",
                "metadata.google.internal",
                "metadata.gke.internal",
                "instance-data",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            blocked_cidrs: [
                "10.0.0.0/8",
                "172.16.0.0/12",
                "192.168.0.0/16",
                "169.254.0.0/16",
                "127.0.0.0/8",
                "::1/128",
                "fc00::/7",
                "fe80::/10",
            ]
            .into_iter()
            .filter_map(|cidr| cidr.parse().ok())
            .collect(),
        }
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Validate an absolute URL.
    pub fn validate(&self, url: &str) -> SecurityResult<Url> {
        let parsed = Url::parse(url)?;
        self.check(&parsed)?;
        Ok(parsed)
    }

    /// Resolve `candidate` against `base`, then validate it.
    ///
    /// Fragments are dropped so `page#a` and `page#b` are one URL.
    pub fn resolve(&self, base: &str, candidate: &str) -> SecurityResult<Url> {
        let candidate = candidate.trim();
        let mut resolved = match Url::parse(candidate) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base)?.join(candidate)?,
            Err(e) => return Err(e.into()),
        };
        resolved.set_fragment(None);
        self.check(&resolved)?;
        Ok(resolved)
    }

    fn check(&self, parsed: &Url) -> SecurityResult<()> {
        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;
        let bare = host.trim_start_matches('[').trim_end_matches(']');

        if self.blocked_hosts.contains(bare) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }

        if let Ok(ip) = bare.parse::<IpAddr>() {
            if self.blocked_cidrs.iter().any(|cidr| cidr.contains(&ip)) {
                return Err(SecurityError::BlockedCidr(ip.to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_urls_pass() {
        let validator = UrlValidator::new();
        assert!(validator.validate("https://example.com/perks").is_ok());
        assert!(validator.validate("http://93.184.216.34/").is_ok());
    }

    #[test]
    fn test_blocked_targets() {
        let validator = UrlValidator::new();
        assert!(matches!(
            validator.validate("file:///etc/passwd"),
            Err(SecurityError::DisallowedScheme(_))
        ));
        assert!(matches!(
            validator.validate("http://localhost:8080"),
            Err(SecurityError::BlockedHost(_))
        ));
        assert!(matches!(
            validator.validate("http://169.254.169.254/latest/meta-data"),
            Err(SecurityError::BlockedCidr(_))
        ));
        assert!(matches!(
            validator.validate("http://[::1]/"),
            Err(SecurityError::BlockedCidr(_))
        ));
        assert!(validator.validate("http://192.168.1.10/").is_err());
    }

    #[test]
    fn test_resolve_relative_and_strip_fragment() {
        let validator = UrlValidator::new();
        let url = validator
            .resolve("https://acme.example/startups/", "apply#form")
            .unwrap();
        assert_eq!(url.as_str(), "https://acme.example/startups/apply");

        let url = validator
            .resolve("https://acme.example/a", "https://other.example/b")
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example/b");
    }

    #[test]
    fn test_resolve_rejects_mailto() {
        let validator = UrlValidator::new();
        assert!(validator
            .resolve("https://acme.example/", "mailto:perks@acme.example")
            .is_err());
    }
}
