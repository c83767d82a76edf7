//! Integration tests for the batch runner.
//!
//! A small record store is classified, enriched and written back using
//! in-memory mocks for every external service.

use std::sync::Arc;

use perk_enrichment::{
    testing::MockSearcher, BatchConfig, BatchRunner, CrawlAndDecide, CrawlDecision, FieldValue,
    InputRecord, LivenessClassifier, LivenessConfig, LivenessVerdict, MemoryStore,
    MockDecisionMaker, MockExtractor, MockFetcher, MockProbe, PartialPerkRecord, PerkField,
    RecordStatus, StatusPolicy,
};
use serde_json::Value;

/// Helper to create a classifier over a shared probe.
fn liveness(probe: &MockProbe) -> LivenessClassifier {
    LivenessClassifier::new(Arc::new(probe.clone()), &LivenessConfig::default())
}

/// Helper to create a crawler that aggregates after the first page.
fn crawler(fetcher: &MockFetcher, extractor: &MockExtractor) -> CrawlAndDecide {
    CrawlAndDecide::new(
        Arc::new(fetcher.clone()),
        Arc::new(extractor.clone()),
        Arc::new(MockDecisionMaker::always(CrawlDecision::aggregate())),
    )
    .with_searcher(Arc::new(MockSearcher::new()))
}

fn good_site() -> (MockProbe, MockFetcher, MockExtractor) {
    let probe = MockProbe::new()
        .head_status("http://good.example", 200)
        .get_status("http://good.example", 200, "<html><title>Good perks</title></html>");
    let fetcher = MockFetcher::new().with_page("http://good.example", "Get $500 in credits");
    let extractor = MockExtractor::new().with_result_for(
        "Get $500 in credits",
        PartialPerkRecord::not_found()
            .with_field(PerkField::BenefitSummary, "$500 in credits")
            .with_field(PerkField::AccessInstructions, "Sign up with code GOOD"),
    );
    (probe, fetcher, extractor)
}

fn config() -> BatchConfig {
    BatchConfig::default().with_delay_ms(0)
}

#[tokio::test]
async fn test_live_record_is_enriched_and_written() {
    let (probe, fetcher, extractor) = good_site();
    let store = MemoryStore::new().with_record(InputRecord::new("r1", "Good").with_url("good.example"));

    let report = BatchRunner::new(Arc::new(store.clone()), liveness(&probe), config())
        .with_crawler(crawler(&fetcher, &extractor))
        .run()
        .await
        .unwrap();

    let output = &report.records[0];
    assert_eq!(output.verdict, LivenessVerdict::Alive);
    assert_eq!(output.fields.benefit_summary, FieldValue::found("$500 in credits"));
    assert_eq!(output.fields.monetary_value, FieldValue::NotFound);
    assert_eq!(output.visited_urls, vec!["http://good.example/".to_string()]);
    assert!(output.last_updated.is_some());

    let stored = store.get("r1").unwrap();
    assert_eq!(stored.status, RecordStatus::Active);
    assert_eq!(stored.prior.benefit_summary, FieldValue::found("$500 in credits"));
    assert_eq!(stored.prior.access_instructions, FieldValue::found("Sign up with code GOOD"));

    // NotFound never reaches the store
    let (_, fields) = &store.updates()[0];
    assert!(!fields.contains_key("Value"));
    assert!(!fields.contains_key("Brief description of the provider"));

    assert_eq!(report.summary.active, vec!["Good".to_string()]);
    assert_eq!(report.summary.updated, vec!["Good".to_string()]);
}

#[tokio::test]
async fn test_value_field_is_independent_of_description() {
    let (probe, fetcher, _) = good_site();
    let extractor = MockExtractor::new().with_default(
        PartialPerkRecord::not_found().with_field(PerkField::ProviderDescription, "Gives $500 AWS credits"),
    );
    let store = MemoryStore::new().with_record(InputRecord::new("r1", "Good").with_url("http://good.example"));

    let report = BatchRunner::new(Arc::new(store), liveness(&probe), config())
        .with_crawler(crawler(&fetcher, &extractor))
        .run()
        .await
        .unwrap();

    let output = &report.records[0];
    assert_eq!(output.verdict, LivenessVerdict::Alive);
    assert_eq!(output.fields.provider_description, FieldValue::found("Gives $500 AWS credits"));
    assert_eq!(output.fields.monetary_value, FieldValue::NotFound);
    assert_eq!(output.fields.monetary_value.as_str(), "Not found");
}

#[tokio::test]
async fn test_summary_partitions_every_record() {
    let (probe, fetcher, extractor) = good_site();
    let probe = probe
        .head_status("http://gone.example", 404)
        .get_status("http://gone.example", 404, "Not Found")
        .get_fails("http://flaky.example");
    let store = MemoryStore::new()
        .with_record(InputRecord::new("r1", "Good").with_url("good.example"))
        .with_record(InputRecord::new("r2", "Gone").with_url("http://gone.example"))
        .with_record(InputRecord::new("r3", "Nolink"))
        .with_record(InputRecord::new("r4", "Mailer").with_url("perks@mailer.example"))
        .with_record(InputRecord::new("r5", "Flaky").with_url("http://flaky.example"));

    let report = BatchRunner::new(Arc::new(store), liveness(&probe), config())
        .with_crawler(crawler(&fetcher, &extractor))
        .run()
        .await
        .unwrap();

    let summary = &report.summary;
    assert_eq!(summary.active, vec!["Good".to_string()]);
    assert_eq!(summary.inactive, vec!["Gone".to_string(), "Flaky".to_string()]);
    assert_eq!(summary.no_link, vec!["Nolink".to_string(), "Mailer".to_string()]);
    assert_eq!(summary.processed(), 5);
    assert!(!report.cancelled);

    let verdicts: Vec<LivenessVerdict> = report.records.iter().map(|r| r.verdict).collect();
    assert_eq!(
        verdicts,
        vec![
            LivenessVerdict::Alive,
            LivenessVerdict::Dead,
            LivenessVerdict::NoUrl,
            LivenessVerdict::IsEmail,
            LivenessVerdict::Unknown,
        ]
    );

    // Only the live record was crawled
    assert_eq!(fetcher.urls(), vec!["http://good.example".to_string()]);
}

#[tokio::test]
async fn test_unknown_status_policy() {
    let probe = MockProbe::new().get_fails("http://flaky.example");
    let store = MemoryStore::new()
        .with_record(InputRecord::new("r1", "Flaky").with_url("http://flaky.example"));

    let keep = config().with_status_policy(StatusPolicy {
        unknown_as_broken: false,
    });
    BatchRunner::new(Arc::new(store.clone()), liveness(&probe), keep)
        .run()
        .await
        .unwrap();
    assert_eq!(store.update_count(), 0);

    BatchRunner::new(Arc::new(store.clone()), liveness(&probe), config())
        .run()
        .await
        .unwrap();
    assert_eq!(store.get("r1").unwrap().status, RecordStatus::BrokenExpired);
}

#[tokio::test]
async fn test_skip_broken_makes_no_network_calls() {
    let probe = MockProbe::new();
    let store = MemoryStore::new().with_record(
        InputRecord::new("r1", "Old")
            .with_url("http://old.example")
            .with_status(RecordStatus::BrokenExpired),
    );

    let report = BatchRunner::new(Arc::new(store.clone()), liveness(&probe), config().with_skip_broken(true))
        .run()
        .await
        .unwrap();

    assert_eq!(probe.call_count(), 0);
    assert_eq!(report.records[0].verdict, LivenessVerdict::Dead);
    assert_eq!(report.summary.inactive, vec!["Old".to_string()]);
    assert_eq!(store.update_count(), 0);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let (probe, fetcher, extractor) = good_site();
    let store = MemoryStore::new().with_record(InputRecord::new("r1", "Good").with_url("good.example"));

    let report = BatchRunner::new(Arc::new(store.clone()), liveness(&probe), config().with_dry_run(true))
        .with_crawler(crawler(&fetcher, &extractor))
        .run()
        .await
        .unwrap();

    assert_eq!(store.update_count(), 0);
    assert_eq!(store.get("r1").unwrap().status, RecordStatus::Unknown);
    assert_eq!(report.summary.updated, vec!["Good".to_string()]);
    assert_eq!(report.records[0].fields.benefit_summary, FieldValue::found("$500 in credits"));
}

#[tokio::test]
async fn test_unchanged_status_is_not_rewritten() {
    let (probe, _, _) = good_site();
    let store = MemoryStore::new().with_record(
        InputRecord::new("r1", "Good")
            .with_url("good.example")
            .with_status(RecordStatus::Active),
    );

    let report = BatchRunner::new(Arc::new(store.clone()), liveness(&probe), config().with_enrich(false))
        .run()
        .await
        .unwrap();

    assert_eq!(store.update_count(), 0);
    assert!(report.summary.updated.is_empty());
}

#[tokio::test]
async fn test_failed_write_is_reported() {
    let (probe, fetcher, extractor) = good_site();
    let store = MemoryStore::new()
        .with_record(InputRecord::new("r1", "Good").with_url("good.example"))
        .with_failing_update("r1");

    let report = BatchRunner::new(Arc::new(store), liveness(&probe), config())
        .with_crawler(crawler(&fetcher, &extractor))
        .run()
        .await
        .unwrap();

    assert_eq!(report.summary.failed_updates, vec!["Good".to_string()]);
    assert!(report.summary.updated.is_empty());
}

#[tokio::test]
async fn test_unreachable_store_fails_the_run() {
    let result = BatchRunner::new(Arc::new(MemoryStore::unreachable()), liveness(&MockProbe::new()), config())
        .run()
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_numeric_value_column() {
    let (probe, fetcher, _) = good_site();
    let extractor = MockExtractor::new().with_default(
        PartialPerkRecord::not_found().with_field(PerkField::MonetaryValue, "$5,000"),
    );
    let store = MemoryStore::new().with_record(InputRecord::new("r1", "Good").with_url("good.example"));

    let config = config().with_monetary_strategy(perk_enrichment::MonetaryStrategy::Numeric);
    let report = BatchRunner::new(Arc::new(store.clone()), liveness(&probe), config)
        .with_crawler(crawler(&fetcher, &extractor))
        .run()
        .await
        .unwrap();

    let (_, fields) = &store.updates()[0];
    assert_eq!(fields.get("Value"), Some(&Value::from(5000u64)));
    assert_eq!(report.records[0].fields.monetary_value, FieldValue::found("5000"));
}
