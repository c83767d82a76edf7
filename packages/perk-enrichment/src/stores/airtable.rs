//! Airtable REST API record store.
//!
//! Requires the `airtable` feature.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{EnrichmentError, Result};
use crate::pipeline::mapping::{LINK_COLUMN, NAME_COLUMN, STATUS_COLUMN};
use crate::retry::RetryPolicy;
use crate::security::ServiceCredentials;
use crate::traits::store::{FieldMap, RecordStore};
use crate::types::{
    perk::{FieldValue, PartialPerkRecord, PerkField},
    record::{InputRecord, RecordStatus},
};

const AIRTABLE_API_URL: &str = "https://api.airtable.com";

/// One Airtable table as a [`RecordStore`].
pub struct AirtableStore {
    client: Client,
    credentials: ServiceCredentials,
    base_id: String,
    table_id: String,
    retry: RetryPolicy,
}

#[derive(Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

#[derive(Deserialize)]
struct AirtableRecord {
    id: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    fields: &'a FieldMap,
}

impl AirtableStore {
    pub fn new(
        credentials: ServiceCredentials,
        base_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EnrichmentError::Config(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            base_id: base_id.into(),
            table_id: table_id.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn table_url(&self) -> String {
        format!(
            "{}/v0/{}/{}",
            self.credentials.base_url_or(AIRTABLE_API_URL),
            self.base_id,
            self.table_id
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EnrichmentError::RateLimited {
                service: "airtable".to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Store(
                format!("airtable error {}: {}", status, body).into(),
            ));
        }
        Ok(response)
    }

    async fn list_page(&self, offset: Option<&str>) -> Result<ListResponse> {
        let mut request = self
            .client
            .get(self.table_url())
            .bearer_auth(self.credentials.api_key.expose());
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EnrichmentError::Store(Box::new(e)))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| EnrichmentError::Store(Box::new(e)))
    }

    async fn patch(&self, id: &str, fields: &FieldMap) -> Result<()> {
        let response = self
            .client
            .patch(format!("{}/{}", self.table_url(), id))
            .bearer_auth(self.credentials.api_key.expose())
            .json(&UpdateRequest { fields })
            .send()
            .await
            .map_err(|e| EnrichmentError::Store(Box::new(e)))?;
        Self::check(response).await?;
        Ok(())
    }
}

fn text_field(fields: &Map<String, Value>, column: &str) -> Option<String> {
    match fields.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn into_input(record: AirtableRecord) -> InputRecord {
    let fields = &record.fields;

    let mut prior = PartialPerkRecord::not_found();
    for field in PerkField::ALL {
        if let Some(value) = fields.get(field.column_name()) {
            let parsed = serde_json::from_value::<FieldValue>(value.clone())
                .unwrap_or(FieldValue::NotFound);
            prior.set(field, parsed);
        }
    }

    let mut input = InputRecord::new(
        record.id.clone(),
        text_field(fields, NAME_COLUMN).unwrap_or_default(),
    )
    .with_status(
        text_field(fields, STATUS_COLUMN)
            .map(|s| RecordStatus::parse(&s))
            .unwrap_or_default(),
    )
    .with_prior(prior);

    if let Some(link) = text_field(fields, LINK_COLUMN) {
        input = input.with_url(link);
    }
    input
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn fetch_all(&self) -> Result<Vec<InputRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let current = offset.clone();
            let page = self
                .retry
                .run("airtable list", || self.list_page(current.as_deref()))
                .await?;
            debug!(records = page.records.len(), more = page.offset.is_some(), "Fetched Airtable page");

            records.extend(page.records.into_iter().map(into_input));
            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!(records = records.len(), "Fetched records from Airtable");
        Ok(records)
    }

    async fn update(&self, id: &str, fields: &FieldMap) -> Result<()> {
        self.retry
            .run("airtable update", || self.patch(id, fields))
            .await
    }
}
