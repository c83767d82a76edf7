//! Exa search API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{EnrichmentError, Result};
use crate::retry::RetryPolicy;
use crate::security::ServiceCredentials;
use crate::traits::searcher::WebSearcher;
use crate::types::page::SearchHit;

const EXA_API_URL: &str = "https://api.exa.ai";

/// Exa neural search returning page text for the top results.
pub struct ExaSearcher {
    client: Client,
    credentials: ServiceCredentials,
    num_results: u32,
    max_chars: u32,
    retry: RetryPolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: u32,
    contents: Contents,
}

#[derive(Serialize)]
struct Contents {
    text: TextOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextOptions {
    max_characters: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Deserialize)]
struct ExaResult {
    url: Option<String>,
    title: Option<String>,
    text: Option<String>,
}

impl ExaSearcher {
    pub fn new(credentials: ServiceCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EnrichmentError::Config(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            num_results: 5,
            max_chars: 3000,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_num_results(mut self, n: u32) -> Self {
        self.num_results = n;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn query(&self, query: &str) -> Result<SearchResponse> {
        let url = format!("{}/search", self.credentials.base_url_or(EXA_API_URL));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.credentials.api_key.expose())
            .json(&SearchRequest {
                query,
                num_results: self.num_results,
                contents: Contents {
                    text: TextOptions {
                        max_characters: self.max_chars,
                    },
                },
            })
            .send()
            .await
            .map_err(|e| EnrichmentError::Search(Box::new(e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EnrichmentError::RateLimited {
                service: "exa".to_string(),
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Search(
                format!("exa error {}: {}", status, error_text).into(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| EnrichmentError::Search(Box::new(e)))
    }
}

fn into_hits(response: SearchResponse) -> Vec<SearchHit> {
    response
        .results
        .into_iter()
        .filter_map(|r| {
            let text = match (r.title, r.text) {
                (Some(title), Some(text)) => format!("{}\n{}", title.trim(), text.trim()),
                (None, Some(text)) => text.trim().to_string(),
                (Some(title), None) => title.trim().to_string(),
                (None, None) => return None,
            };
            let hit = SearchHit::new(text);
            Some(match r.url {
                Some(url) => hit.with_source(url),
                None => hit,
            })
        })
        .collect()
}

#[async_trait]
impl WebSearcher for ExaSearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self.retry.run("exa search", || self.query(query)).await?;
        let hits = into_hits(response);
        debug!(query = %query, hits = hits.len(), "Exa search");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "exa"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(SearchRequest {
            query: "acme credits",
            num_results: 5,
            contents: Contents {
                text: TextOptions {
                    max_characters: 3000,
                },
            },
        })
        .unwrap();

        assert_eq!(body["numResults"], 5);
        assert_eq!(body["contents"]["text"]["maxCharacters"], 3000);
    }

    #[test]
    fn test_into_hits() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"results": [
                {"url": "https://acme.example", "title": "Acme", "text": "Startup credits"},
                {"url": "https://empty.example"}
            ]}"#,
        )
        .unwrap();
        let hits = into_hits(response);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "Acme\nStartup credits");
        assert_eq!(hits[0].source_url.as_deref(), Some("https://acme.example"));
    }
}
