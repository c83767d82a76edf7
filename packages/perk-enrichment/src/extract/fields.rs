//! Perk field extraction through an LLM.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::{detect_blocking, extract_json_object, prompts, truncate_chars};
use crate::traits::{
    extractor::FieldExtractor,
    llm::{CompletionRequest, LanguageModel},
};
use crate::types::{
    config::ExtractorConfig,
    perk::{FieldValue, PartialPerkRecord, PerkField},
};

/// Extracts the four perk fields with a single completion.
///
/// - Blank input: all `NotFound`, no LLM call
/// - Blocking indicators in the input: all `Blocked`, no LLM call
/// - Transport failure or unparseable output: all `ParseError`
pub struct LlmFieldExtractor<L: LanguageModel> {
    llm: L,
    config: ExtractorConfig,
}

impl<L: LanguageModel> LlmFieldExtractor<L> {
    pub fn new(llm: L) -> Self {
        Self::with_config(llm, ExtractorConfig::default())
    }

    pub fn with_config(llm: L, config: ExtractorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }
}

#[async_trait]
impl<L: LanguageModel> FieldExtractor for LlmFieldExtractor<L> {
    async fn extract(&self, page_text: &str) -> PartialPerkRecord {
        if page_text.trim().is_empty() {
            debug!("Empty input, nothing to extract");
            return PartialPerkRecord::not_found();
        }

        if detect_blocking(page_text, &self.config.blocking_keywords) {
            debug!("Blocking indicators in input, skipping LLM");
            return PartialPerkRecord::blocked();
        }

        let input = truncate_chars(page_text, self.config.max_input_chars);
        if input.len() < page_text.len() {
            debug!(
                original_chars = page_text.chars().count(),
                kept_chars = self.config.max_input_chars,
                "Truncated extractor input"
            );
        }

        let request = CompletionRequest::new(prompts::format_extract_prompt(input))
            .with_temperature(self.config.temperature);

        match self.llm.complete(&request).await {
            Ok(response) => parse_fields_response(&response),
            Err(e) => {
                warn!(error = %e, "Field extraction call failed");
                PartialPerkRecord::parse_error()
            }
        }
    }
}

/// Parse the model's JSON answer into a record.
///
/// Keys are matched by column name or alias; the first key seen for a
/// field wins. Non-scalar values become `ParseError` for that field. An
/// answer with no JSON object, or none of the four keys, is all
/// `ParseError`.
pub fn parse_fields_response(response: &str) -> PartialPerkRecord {
    let Some(json) = extract_json_object(response) else {
        warn!("No JSON object in extraction response");
        return PartialPerkRecord::parse_error();
    };

    let object = match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return PartialPerkRecord::parse_error(),
        Err(e) => {
            warn!(error = %e, "Malformed JSON in extraction response");
            return PartialPerkRecord::parse_error();
        }
    };

    let mut record = PartialPerkRecord::not_found();
    let mut seen: Vec<PerkField> = Vec::with_capacity(4);

    for (key, value) in object {
        let Some(field) = PerkField::from_key(&key) else {
            continue;
        };
        if seen.contains(&field) {
            continue;
        }
        seen.push(field);

        let value = match value {
            Value::String(_) | Value::Number(_) | Value::Null => {
                serde_json::from_value::<FieldValue>(value).unwrap_or(FieldValue::ParseError)
            }
            _ => FieldValue::ParseError,
        };
        record.set(field, value);
    }

    if seen.is_empty() {
        warn!("Extraction response had none of the perk fields");
        return PartialPerkRecord::parse_error();
    }

    record
}
