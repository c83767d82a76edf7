use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Updater configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub airtable_table_id: Option<String>,
    pub airtable_last_edited_field: Option<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub exa_api_key: Option<String>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            airtable_api_key: optional("AIRTABLE_API_KEY"),
            airtable_base_id: optional("AIRTABLE_BASE_ID"),
            airtable_table_id: optional("AIRTABLE_TABLE_ID"),
            airtable_last_edited_field: optional("AIRTABLE_LAST_EDITED_FIELD"),
            openai_api_key: env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set")?,
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_base_url: optional("OPENAI_BASE_URL"),
            firecrawl_api_key: optional("FIRECRAWL_API_KEY"),
            perplexity_api_key: optional("PERPLEXITY_API_KEY"),
            exa_api_key: optional("EXA_API_KEY"),
            browserless_url: optional("BROWSERLESS_URL"),
            browserless_token: optional("BROWSERLESS_TOKEN"),
        })
    }

    /// Airtable settings, required only by the batch commands.
    pub fn airtable(&self) -> Result<AirtableSettings<'_>> {
        Ok(AirtableSettings {
            api_key: self
                .airtable_api_key
                .as_deref()
                .context("AIRTABLE_API_KEY must be set")?,
            base_id: self
                .airtable_base_id
                .as_deref()
                .context("AIRTABLE_BASE_ID must be set")?,
            table_id: self
                .airtable_table_id
                .as_deref()
                .context("AIRTABLE_TABLE_ID must be set")?,
        })
    }
}

/// Borrowed Airtable connection settings.
#[derive(Debug, Clone, Copy)]
pub struct AirtableSettings<'a> {
    pub api_key: &'a str,
    pub base_id: &'a str,
    pub table_id: &'a str,
}

/// Unset and empty both mean absent.
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            airtable_api_key: None,
            airtable_base_id: None,
            airtable_table_id: None,
            airtable_last_edited_field: None,
            openai_api_key: "sk-test".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_base_url: None,
            firecrawl_api_key: None,
            perplexity_api_key: None,
            exa_api_key: None,
            browserless_url: None,
            browserless_token: None,
        }
    }

    #[test]
    fn test_airtable_settings_are_optional_until_needed() {
        let err = config().airtable().unwrap_err();
        assert!(err.to_string().contains("AIRTABLE_API_KEY"));

        let partial = Config {
            airtable_api_key: Some("key".to_string()),
            airtable_base_id: Some("app1".to_string()),
            ..config()
        };
        let err = partial.airtable().unwrap_err();
        assert!(err.to_string().contains("AIRTABLE_TABLE_ID"));
    }

    #[test]
    fn test_airtable_settings_complete() {
        let full = Config {
            airtable_api_key: Some("key".to_string()),
            airtable_base_id: Some("app1".to_string()),
            airtable_table_id: Some("tbl1".to_string()),
            ..config()
        };

        let settings = full.airtable().unwrap();

        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.base_id, "app1");
        assert_eq!(settings.table_id, "tbl1");
    }
}
