//! reqwest-backed HTTP probe for liveness checks.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{redirect, Client};
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::HttpProbe;
use crate::types::{config::LivenessConfig, page::ProbeResponse};

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.5";
const MAX_REDIRECTS: usize = 10;

/// HEAD/GET probe sending browser-like headers and following redirects.
pub struct ReqwestProbe {
    client: Client,
    head_timeout: Duration,
    get_timeout: Duration,
}

impl ReqwestProbe {
    pub fn new(config: &LivenessConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            head_timeout: Duration::from_secs(config.head_timeout_secs),
            get_timeout: Duration::from_secs(config.get_timeout_secs),
        })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn head(&self, url: &str) -> FetchResult<ProbeResponse> {
        let response = self
            .client
            .head(url)
            .timeout(self.head_timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        debug!(url = %url, status, "HEAD");
        Ok(ProbeResponse::new(status, response.url().as_str()))
    }

    async fn get(&self, url: &str) -> FetchResult<ProbeResponse> {
        let response = self
            .client
            .get(url)
            .timeout(self.get_timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(url = %url, status, bytes = body.len(), "GET");
        Ok(ProbeResponse::new(status, final_url).with_body(body))
    }
}
