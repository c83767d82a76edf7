//! Mapping between engine results and store columns.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::traits::store::FieldMap;
use crate::types::{
    config::{BatchConfig, MonetaryStrategy, StatusPolicy},
    perk::{FinalPerkRecord, PerkField},
    record::{InputRecord, LivenessVerdict, RecordStatus},
};

pub const NAME_COLUMN: &str = "Name";
pub const LINK_COLUMN: &str = "Link";
pub const STATUS_COLUMN: &str = "Status";

/// Store status for a verdict. `None` leaves the column untouched.
pub fn status_for(verdict: LivenessVerdict, policy: StatusPolicy) -> Option<RecordStatus> {
    match verdict {
        LivenessVerdict::Alive => Some(RecordStatus::Active),
        LivenessVerdict::Dead => Some(RecordStatus::BrokenExpired),
        LivenessVerdict::Unknown if policy.unknown_as_broken => Some(RecordStatus::BrokenExpired),
        LivenessVerdict::Unknown | LivenessVerdict::NoUrl | LivenessVerdict::IsEmail => None,
    }
}

/// Columns to write back for one record.
///
/// Status is included only when it changed. Perk fields are included
/// only when `Found`; sentinels never overwrite stored text.
pub fn field_map(
    input: &InputRecord,
    output: &FinalPerkRecord,
    config: &BatchConfig,
    now: DateTime<Utc>,
) -> FieldMap {
    let mut fields = FieldMap::new();

    if let Some(status) = status_for(output.verdict, config.status_policy) {
        if status != input.status {
            if let Some(raw) = status.as_store_str() {
                fields.insert(STATUS_COLUMN.to_string(), Value::from(raw));
            }
        }
    }

    let mut wrote_perk = false;
    for (field, value) in output.fields.iter() {
        let Some(text) = value.as_found().filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        fields.insert(
            field.column_name().to_string(),
            column_value(field, text, config.monetary_strategy),
        );
        wrote_perk = true;
    }

    if wrote_perk {
        if let Some(column) = &config.last_edited_field {
            fields.insert(
                column.clone(),
                Value::from(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
    }

    fields
}

/// True when the map writes at least one perk column.
pub fn writes_perk_fields(fields: &FieldMap) -> bool {
    PerkField::ALL
        .iter()
        .any(|field| fields.contains_key(field.column_name()))
}

fn column_value(field: PerkField, text: &str, strategy: MonetaryStrategy) -> Value {
    match (field, strategy) {
        (PerkField::MonetaryValue, MonetaryStrategy::Numeric) => text
            .parse::<u64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(text)),
        _ => Value::from(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::perk::{FieldValue, PartialPerkRecord};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn output(verdict: LivenessVerdict, fields: PartialPerkRecord) -> FinalPerkRecord {
        FinalPerkRecord::unenriched("r1", "Acme", verdict).with_fields(fields)
    }

    #[test]
    fn test_status_mapping() {
        let collapse = StatusPolicy::default();
        let keep = StatusPolicy {
            unknown_as_broken: false,
        };

        assert_eq!(
            status_for(LivenessVerdict::Alive, collapse),
            Some(RecordStatus::Active)
        );
        assert_eq!(
            status_for(LivenessVerdict::Dead, keep),
            Some(RecordStatus::BrokenExpired)
        );
        assert_eq!(
            status_for(LivenessVerdict::Unknown, collapse),
            Some(RecordStatus::BrokenExpired)
        );
        assert_eq!(status_for(LivenessVerdict::Unknown, keep), None);
        assert_eq!(status_for(LivenessVerdict::NoUrl, collapse), None);
        assert_eq!(status_for(LivenessVerdict::IsEmail, collapse), None);
    }

    #[test]
    fn test_status_written_only_on_change() {
        let input = InputRecord::new("r1", "Acme").with_status(RecordStatus::Active);
        let fields = field_map(
            &input,
            &output(LivenessVerdict::Alive, PartialPerkRecord::not_found()),
            &BatchConfig::default(),
            now(),
        );
        assert!(fields.is_empty());

        let input = InputRecord::new("r1", "Acme");
        let fields = field_map(
            &input,
            &output(LivenessVerdict::Alive, PartialPerkRecord::not_found()),
            &BatchConfig::default(),
            now(),
        );
        assert_eq!(fields.get(STATUS_COLUMN), Some(&Value::from("active")));
    }

    #[test]
    fn test_only_found_fields_are_written() {
        let merged = PartialPerkRecord::blocked()
            .with_field(PerkField::BenefitSummary, "Credits")
            .with_field(PerkField::AccessInstructions, FieldValue::NotFound);
        let config = BatchConfig::default().with_last_edited_field("Last edited time");

        let fields = field_map(
            &InputRecord::new("r1", "Acme").with_status(RecordStatus::Active),
            &output(LivenessVerdict::Alive, merged),
            &config,
            now(),
        );

        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["What you get", "Last edited time"]);
        assert_eq!(
            fields.get("Last edited time"),
            Some(&Value::from("2024-05-01T12:00:00Z"))
        );
        assert!(writes_perk_fields(&fields));
    }

    #[test]
    fn test_numeric_value_written_as_number() {
        let merged = PartialPerkRecord::not_found().with_field(PerkField::MonetaryValue, "5000");
        let config = BatchConfig::default().with_monetary_strategy(MonetaryStrategy::Numeric);

        let fields = field_map(
            &InputRecord::new("r1", "Acme").with_status(RecordStatus::Active),
            &output(LivenessVerdict::Alive, merged.clone()),
            &config,
            now(),
        );
        assert_eq!(fields.get("Value"), Some(&Value::from(5000u64)));

        let fields = field_map(
            &InputRecord::new("r1", "Acme").with_status(RecordStatus::Active),
            &output(LivenessVerdict::Alive, merged),
            &BatchConfig::default(),
            now(),
        );
        assert_eq!(fields.get("Value"), Some(&Value::from("5000")));
    }
}
