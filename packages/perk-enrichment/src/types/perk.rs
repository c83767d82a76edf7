//! Perk field types - sentinel values, partial and final records.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::record::LivenessVerdict;

/// One perk field's value, or the reason there is none.
///
/// Serialised as a plain string so stored records keep their legacy
/// spellings (`"Not found"`, `"Blocked"`, `"Error parsing"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FieldValue {
    /// A value grounded in some source text
    Found(String),

    /// No source mentioned this field
    #[default]
    NotFound,

    /// The source page was bot-blocked
    Blocked,

    /// The extractor's output could not be parsed
    ParseError,
}

impl FieldValue {
    pub const NOT_FOUND: &'static str = "Not found";
    pub const BLOCKED: &'static str = "Blocked";
    pub const PARSE_ERROR: &'static str = "Error parsing";

    /// Wrap a found value.
    pub fn found(value: impl Into<String>) -> Self {
        FieldValue::Found(value.into())
    }

    /// Interpret a legacy string, mapping sentinel spellings and blanks.
    pub fn from_legacy(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(Self::NOT_FOUND) {
            FieldValue::NotFound
        } else if trimmed.eq_ignore_ascii_case(Self::BLOCKED) {
            FieldValue::Blocked
        } else if trimmed.eq_ignore_ascii_case(Self::PARSE_ERROR) {
            FieldValue::ParseError
        } else {
            FieldValue::Found(raw.to_string())
        }
    }

    /// The found text, if any.
    pub fn as_found(&self) -> Option<&str> {
        match self {
            FieldValue::Found(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// True for a found value with non-blank text.
    pub fn is_found(&self) -> bool {
        self.as_found().is_some_and(|v| !v.trim().is_empty())
    }

    /// Legacy string spelling.
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Found(value) => value,
            FieldValue::NotFound => Self::NOT_FOUND,
            FieldValue::Blocked => Self::BLOCKED,
            FieldValue::ParseError => Self::PARSE_ERROR,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldValue {
    fn from(raw: &str) -> Self {
        Self::from_legacy(raw)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, a number or null")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::from_legacy(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Found(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        Ok(FieldValue::Found(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
        if v.fract() == 0.0 && v.abs() < 1e15 {
            Ok(FieldValue::Found(format!("{}", v as i64)))
        } else {
            Ok(FieldValue::Found(v.to_string()))
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::NotFound)
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::NotFound)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// The four semantic perk fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerkField {
    ProviderDescription,
    BenefitSummary,
    AccessInstructions,
    MonetaryValue,
}

impl PerkField {
    pub const ALL: [PerkField; 4] = [
        PerkField::ProviderDescription,
        PerkField::BenefitSummary,
        PerkField::AccessInstructions,
        PerkField::MonetaryValue,
    ];

    /// Column name in the record store (also the LLM response key).
    pub fn column_name(self) -> &'static str {
        match self {
            PerkField::ProviderDescription => "Brief description of the provider",
            PerkField::BenefitSummary => "What you get",
            PerkField::AccessInstructions => "How to get it",
            PerkField::MonetaryValue => "Value",
        }
    }

    /// Short human label, used in search queries.
    pub fn label(self) -> &'static str {
        match self {
            PerkField::ProviderDescription => "provider description",
            PerkField::BenefitSummary => "benefits",
            PerkField::AccessInstructions => "how to get it",
            PerkField::MonetaryValue => "value",
        }
    }

    /// Resolve a column name or one of its known aliases.
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "brief description of the provider" | "provider description" => {
                Some(PerkField::ProviderDescription)
            }
            "what you get" | "benefit summary" => Some(PerkField::BenefitSummary),
            "how to get it" | "access instructions" => Some(PerkField::AccessInstructions),
            "value" | "money value" | "monetary value" => Some(PerkField::MonetaryValue),
            _ => None,
        }
    }
}

impl fmt::Display for PerkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One source's attempt at filling the four perk fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PartialPerkRecord {
    #[serde(
        rename = "Brief description of the provider",
        alias = "Provider Description",
        alias = "provider_description",
        default
    )]
    pub provider_description: FieldValue,

    #[serde(
        rename = "What you get",
        alias = "What You Get",
        alias = "benefit_summary",
        default
    )]
    pub benefit_summary: FieldValue,

    #[serde(
        rename = "How to get it",
        alias = "How To Get It",
        alias = "access_instructions",
        default
    )]
    pub access_instructions: FieldValue,

    #[serde(
        rename = "Value",
        alias = "Money Value",
        alias = "monetary_value",
        default
    )]
    pub monetary_value: FieldValue,
}

impl PartialPerkRecord {
    fn filled(value: FieldValue) -> Self {
        Self {
            provider_description: value.clone(),
            benefit_summary: value.clone(),
            access_instructions: value.clone(),
            monetary_value: value,
        }
    }

    /// All four fields `NotFound`.
    pub fn not_found() -> Self {
        Self::default()
    }

    /// All four fields `Blocked`.
    pub fn blocked() -> Self {
        Self::filled(FieldValue::Blocked)
    }

    /// All four fields `ParseError`.
    pub fn parse_error() -> Self {
        Self::filled(FieldValue::ParseError)
    }

    pub fn get(&self, field: PerkField) -> &FieldValue {
        match field {
            PerkField::ProviderDescription => &self.provider_description,
            PerkField::BenefitSummary => &self.benefit_summary,
            PerkField::AccessInstructions => &self.access_instructions,
            PerkField::MonetaryValue => &self.monetary_value,
        }
    }

    pub fn set(&mut self, field: PerkField, value: FieldValue) {
        match field {
            PerkField::ProviderDescription => self.provider_description = value,
            PerkField::BenefitSummary => self.benefit_summary = value,
            PerkField::AccessInstructions => self.access_instructions = value,
            PerkField::MonetaryValue => self.monetary_value = value,
        }
    }

    pub fn with_field(mut self, field: PerkField, value: impl Into<FieldValue>) -> Self {
        self.set(field, value.into());
        self
    }

    /// Iterate `(field, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (PerkField, &FieldValue)> {
        PerkField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }

    /// Fields that hold no found value.
    pub fn missing_fields(&self) -> Vec<PerkField> {
        self.iter()
            .filter(|(_, value)| !value.is_found())
            .map(|(field, _)| field)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

impl From<String> for FieldValue {
    fn from(raw: String) -> Self {
        Self::from_legacy(&raw)
    }
}

/// The merged result for one input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalPerkRecord {
    pub record_id: String,

    pub name: String,

    pub verdict: LivenessVerdict,

    #[serde(flatten)]
    pub fields: PartialPerkRecord,

    /// URLs scraped while enriching, in visit order
    #[serde(default)]
    pub visited_urls: Vec<String>,

    /// Set by the caller, never by the merge
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl FinalPerkRecord {
    /// A record that never entered the crawl loop.
    pub fn unenriched(
        record_id: impl Into<String>,
        name: impl Into<String>,
        verdict: LivenessVerdict,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            name: name.into(),
            verdict,
            fields: PartialPerkRecord::not_found(),
            visited_urls: Vec::new(),
            last_updated: None,
        }
    }

    pub fn with_fields(mut self, fields: PartialPerkRecord) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_visited(mut self, visited: Vec<String>) -> Self {
        self.visited_urls = visited;
        self
    }

    pub fn with_last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_spellings_round_trip() {
        assert_eq!(FieldValue::from_legacy("Not found"), FieldValue::NotFound);
        assert_eq!(FieldValue::from_legacy("not found"), FieldValue::NotFound);
        assert_eq!(FieldValue::from_legacy("Blocked"), FieldValue::Blocked);
        assert_eq!(FieldValue::from_legacy("Error parsing"), FieldValue::ParseError);
        assert_eq!(FieldValue::from_legacy("   "), FieldValue::NotFound);
        assert_eq!(FieldValue::from_legacy("$500"), FieldValue::found("$500"));

        assert_eq!(FieldValue::NotFound.to_string(), "Not found");
        assert_eq!(
            serde_json::to_string(&FieldValue::ParseError).unwrap(),
            "\"Error parsing\""
        );
    }

    #[test]
    fn test_deserialize_numbers_and_null() {
        let v: FieldValue = serde_json::from_str("5000").unwrap();
        assert_eq!(v, FieldValue::found("5000"));

        let v: FieldValue = serde_json::from_str("2500.0").unwrap();
        assert_eq!(v, FieldValue::found("2500"));

        let v: FieldValue = serde_json::from_str("null").unwrap();
        assert_eq!(v, FieldValue::NotFound);
    }

    #[test]
    fn test_partial_record_from_llm_json() {
        let json = r#"{
            "Brief description of the provider": "Cloud hosting",
            "What You Get": "$500 credits",
            "How to get it": "Not found"
        }"#;
        let record: PartialPerkRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.provider_description, FieldValue::found("Cloud hosting"));
        assert_eq!(record.benefit_summary, FieldValue::found("$500 credits"));
        assert_eq!(record.access_instructions, FieldValue::NotFound);
        // Missing keys default to NotFound
        assert_eq!(record.monetary_value, FieldValue::NotFound);
        assert_eq!(
            record.missing_fields(),
            vec![PerkField::AccessInstructions, PerkField::MonetaryValue]
        );
    }

    #[test]
    fn test_field_key_aliases() {
        assert_eq!(PerkField::from_key("Money Value"), Some(PerkField::MonetaryValue));
        assert_eq!(
            PerkField::from_key("provider_description"),
            Some(PerkField::ProviderDescription)
        );
        assert_eq!(PerkField::from_key("How To Get It"), Some(PerkField::AccessInstructions));
        assert_eq!(PerkField::from_key("Name"), None);
    }

    #[test]
    fn test_constructors() {
        assert!(PartialPerkRecord::blocked()
            .iter()
            .all(|(_, v)| *v == FieldValue::Blocked));
        assert!(PartialPerkRecord::parse_error()
            .iter()
            .all(|(_, v)| *v == FieldValue::ParseError));
        assert_eq!(PartialPerkRecord::not_found().missing_fields().len(), 4);

        let full = PartialPerkRecord::not_found()
            .with_field(PerkField::ProviderDescription, "a")
            .with_field(PerkField::BenefitSummary, "b")
            .with_field(PerkField::AccessInstructions, "c")
            .with_field(PerkField::MonetaryValue, "$1");
        assert!(full.is_complete());
    }

    #[test]
    fn test_final_record_json_flattens_fields() {
        let record = FinalPerkRecord::unenriched("r1", "Acme", LivenessVerdict::Dead);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["record_id"], "r1");
        assert_eq!(json["verdict"], "dead");
        assert_eq!(json["Value"], "Not found");

        let back: FinalPerkRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
