//! Property tests for the field merge.

use perk_enrichment::{merge, merge_with, FieldValue, MonetaryStrategy, PartialPerkRecord, PerkField};
use proptest::prelude::*;

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::NotFound),
        Just(FieldValue::Blocked),
        Just(FieldValue::ParseError),
        "[ a-zA-Z0-9$€£,.]{0,16}".prop_map(FieldValue::Found),
    ]
}

fn partial_record() -> impl Strategy<Value = PartialPerkRecord> {
    (field_value(), field_value(), field_value(), field_value()).prop_map(
        |(provider_description, benefit_summary, access_instructions, monetary_value)| {
            PartialPerkRecord {
                provider_description,
                benefit_summary,
                access_instructions,
                monetary_value,
            }
        },
    )
}

fn strategy() -> impl Strategy<Value = MonetaryStrategy> {
    prop_oneof![Just(MonetaryStrategy::PreferCurrency), Just(MonetaryStrategy::Numeric)]
}

proptest! {
    #[test]
    fn merge_is_idempotent(records in prop::collection::vec(partial_record(), 1..6), strategy in strategy()) {
        let once = merge_with(&records, strategy);
        let twice = merge_with(std::slice::from_ref(&once), strategy);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn merge_never_invents_text(records in prop::collection::vec(partial_record(), 0..6)) {
        let merged = merge(&records);
        for (field, value) in merged.iter() {
            match value {
                FieldValue::Found(text) => {
                    prop_assert!(!text.trim().is_empty());
                    prop_assert!(records.iter().any(|r| r.get(field) == value));
                }
                other => prop_assert_eq!(other, &FieldValue::NotFound),
            }
        }
    }

    #[test]
    fn numeric_value_is_digits_from_some_input(records in prop::collection::vec(partial_record(), 0..6)) {
        let merged = merge_with(&records, MonetaryStrategy::Numeric);
        if let FieldValue::Found(amount) = &merged.monetary_value {
            prop_assert!(amount.chars().all(|c| c.is_ascii_digit()));
            prop_assert!(records.iter().any(|r| r
                .monetary_value
                .as_found()
                .is_some_and(|v| v.chars().any(|c| c.is_ascii_digit()))));
        }
    }

    #[test]
    fn text_fields_pick_a_longest_candidate(records in prop::collection::vec(partial_record(), 1..6)) {
        let merged = merge(&records);
        let longest = records
            .iter()
            .filter_map(|r| r.benefit_summary.as_found())
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.chars().count())
            .max();
        let chosen = merged.benefit_summary.as_found().map(|v| v.chars().count());
        prop_assert_eq!(chosen, longest);
    }
}

#[test]
fn test_found_instructions_beat_not_found() {
    let records = [
        PartialPerkRecord::not_found().with_field(PerkField::AccessInstructions, "Email support@x.com"),
        PartialPerkRecord::not_found().with_field(PerkField::AccessInstructions, FieldValue::from_legacy("Not found")),
    ];

    let merged = merge(&records);

    assert_eq!(merged.access_instructions, FieldValue::found("Email support@x.com"));
    assert_eq!(merged.benefit_summary, FieldValue::NotFound);
}

#[test]
fn test_blocked_pages_contribute_nothing() {
    let records = [
        PartialPerkRecord::blocked(),
        PartialPerkRecord::not_found().with_field(PerkField::BenefitSummary, "Free plan"),
    ];

    let merged = merge(&records);

    assert_eq!(merged.benefit_summary, FieldValue::found("Free plan"));
    assert_eq!(merged.provider_description, FieldValue::NotFound);
}
