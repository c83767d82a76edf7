//! Perplexity as a web searcher.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{EnrichmentError, Result};
use crate::extract::prompts::{format_search_prompt, SEARCH_SYSTEM_PROMPT};
use crate::retry::RetryPolicy;
use crate::security::ServiceCredentials;
use crate::traits::searcher::WebSearcher;
use crate::types::page::SearchHit;

use super::openai::{PERPLEXITY_API_URL, PERPLEXITY_MODEL};

/// Asks Perplexity's search-grounded model and returns its answer.
///
/// The answer comes back as one hit; cited URLs are attached as its
/// source.
pub struct PerplexitySearcher {
    client: Client,
    credentials: ServiceCredentials,
    model: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl PerplexitySearcher {
    pub fn new(credentials: ServiceCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| EnrichmentError::Config(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            model: PERPLEXITY_MODEL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn ask(&self, query: &str) -> Result<SearchResponse> {
        let prompt = format_search_prompt(query);
        let body = SearchRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SEARCH_SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", self.credentials.base_url_or(PERPLEXITY_API_URL));
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credentials.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| EnrichmentError::Search(Box::new(e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EnrichmentError::RateLimited {
                service: "perplexity".to_string(),
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Search(
                format!("perplexity error {}: {}", status, error_text).into(),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| EnrichmentError::Search(Box::new(e)))
    }
}

fn into_hits(response: SearchResponse) -> Vec<SearchHit> {
    let Some(answer) = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|a| !a.trim().is_empty())
    else {
        return Vec::new();
    };

    let hit = SearchHit::new(answer);
    if response.citations.is_empty() {
        vec![hit]
    } else {
        vec![hit.with_source(response.citations.join(", "))]
    }
}

#[async_trait]
impl WebSearcher for PerplexitySearcher {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self.retry.run("perplexity search", || self.ask(query)).await?;
        let hits = into_hits(response);
        debug!(query = %query, hits = hits.len(), "Perplexity search");
        Ok(hits)
    }

    fn name(&self) -> &str {
        "perplexity"
    }
}
