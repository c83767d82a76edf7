//! Field merge reconciler.
//!
//! Combines partial records field by field. Only `Found` values with
//! non-blank text are candidates, so the output never holds anything
//! that was not copied from an input (or, for the numeric strategy,
//! reduced from one).

use tracing::trace;

use crate::types::config::MonetaryStrategy;
use crate::types::perk::{FieldValue, PartialPerkRecord, PerkField};

/// Symbols that mark a monetary value as currency-tagged.
pub const CURRENCY_SYMBOLS: [char; 3] = ['$', '€', '£'];

/// Merge with the default monetary strategy (prefer currency-tagged text).
pub fn merge(records: &[PartialPerkRecord]) -> PartialPerkRecord {
    merge_with(records, MonetaryStrategy::PreferCurrency)
}

/// Merge with an explicit monetary strategy.
///
/// Pure: the result depends only on the values and their order.
pub fn merge_with(records: &[PartialPerkRecord], strategy: MonetaryStrategy) -> PartialPerkRecord {
    let mut merged = PartialPerkRecord::not_found();

    for field in PerkField::ALL {
        let candidates: Vec<&str> = records
            .iter()
            .filter_map(|record| match record.get(field) {
                FieldValue::Found(value) if !value.trim().is_empty() => Some(value.as_str()),
                _ => None,
            })
            .collect();

        let chosen = match field {
            PerkField::MonetaryValue => pick_monetary(&candidates, strategy),
            _ => pick_longest(&candidates).map(str::to_string),
        };

        trace!(field = %field, candidates = candidates.len(), chosen = ?chosen, "Merged field");
        merged.set(field, chosen.map_or(FieldValue::NotFound, FieldValue::Found));
    }

    merged
}

/// Longest by character count; the first seen wins ties.
fn pick_longest<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        let len = candidate.chars().count();
        match best {
            Some((_, best_len)) if len <= best_len => {}
            _ => best = Some((*candidate, len)),
        }
    }
    best.map(|(value, _)| value)
}

fn pick_monetary(candidates: &[&str], strategy: MonetaryStrategy) -> Option<String> {
    match strategy {
        MonetaryStrategy::PreferCurrency => prefer_currency(candidates).map(str::to_string),
        MonetaryStrategy::Numeric => {
            let with_digits: Vec<&str> = candidates
                .iter()
                .copied()
                .filter(|c| c.chars().any(|ch| ch.is_ascii_digit()))
                .collect();
            prefer_currency(&with_digits).and_then(normalize_amount)
        }
    }
}

/// First currency-tagged candidate, else the first candidate.
fn prefer_currency<'a>(candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|c| has_currency_symbol(c))
        .or_else(|| candidates.first().copied())
}

pub fn has_currency_symbol(value: &str) -> bool {
    value.contains(CURRENCY_SYMBOLS)
}

/// Strip everything but digits. `None` when no digits remain.
pub fn normalize_amount(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    match digits.parse::<u64>() {
        Ok(amount) => Some(amount.to_string()),
        // Too large for u64; keep the digit string without leading zeros
        Err(_) => {
            let trimmed = digits.trim_start_matches('0');
            Some(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
        }
    }
}
