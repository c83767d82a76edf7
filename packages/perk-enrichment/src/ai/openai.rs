//! OpenAI-compatible chat completions.
//!
//! # Example
//!
//! ```rust,ignore
//! use perk_enrichment::ai::OpenAiChat;
//! use perk_enrichment::security::ServiceCredentials;
//!
//! let llm = OpenAiChat::new(ServiceCredentials::new("sk-..."))?.with_model("gpt-4o");
//! let extractor = LlmFieldExtractor::new(llm);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{EnrichmentError, Result};
use crate::retry::RetryPolicy;
use crate::security::ServiceCredentials;
use crate::traits::llm::{CompletionRequest, LanguageModel};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";
pub const PERPLEXITY_MODEL: &str = "sonar-pro";

/// Chat client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChat {
    client: Client,
    credentials: ServiceCredentials,
    model: String,
    service: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiChat {
    /// OpenAI with `gpt-4o`, unless the credentials carry a base URL.
    pub fn new(credentials: ServiceCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| EnrichmentError::Config(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            model: "gpt-4o".to_string(),
            service: "openai".to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Perplexity's search-grounded `sonar-pro`.
    pub fn perplexity(api_key: impl Into<String>) -> Result<Self> {
        let credentials = ServiceCredentials::new(api_key).with_base_url(PERPLEXITY_API_URL);
        Ok(Self::new(credentials)?
            .with_model(PERPLEXITY_MODEL)
            .with_service_name("perplexity"))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Name used in rate-limit errors and logs.
    pub fn with_service_name(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body<'a>(&'a self, request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_response.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.credentials.base_url_or(OPENAI_API_URL));
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.credentials.api_key.expose())
            .json(&self.build_body(request))
            .send()
            .await
            .map_err(|e| EnrichmentError::Llm(Box::new(e)))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EnrichmentError::RateLimited {
                service: self.service.clone(),
            });
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Llm(
                format!("{} error {}: {}", self.service, status, error_text).into(),
            ));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Llm(Box::new(e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EnrichmentError::Llm(format!("no response from {}", self.service).into()))
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!(service = %self.service, model = %self.model, prompt_chars = request.prompt.len(), "Chat completion");
        self.retry.run("chat completion", || self.send(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let chat = OpenAiChat::new(ServiceCredentials::new("sk-test")).unwrap();
        let request = CompletionRequest::new("Extract")
            .with_system("You extract")
            .with_temperature(0.2)
            .with_json_response();

        let body = serde_json::to_value(chat.build_body(&request)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Extract");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_plain_request_has_no_response_format() {
        let chat = OpenAiChat::perplexity("pplx-test").unwrap();
        let body = serde_json::to_value(chat.build_body(&CompletionRequest::new("hi"))).unwrap();

        assert_eq!(body["model"], "sonar-pro");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("response_format").is_none());
    }
}
