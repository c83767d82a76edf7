//! Batch runner - classify, enrich, merge and write back every record.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::crawl::CrawlAndDecide;
use crate::error::{EnrichmentError, Result};
use crate::liveness::LivenessClassifier;
use crate::pipeline::mapping::{field_map, writes_perk_fields};
use crate::traits::store::RecordStore;
use crate::types::{
    config::BatchConfig,
    perk::FinalPerkRecord,
    record::{InputRecord, LivenessVerdict, RecordStatus},
};

/// Operator-facing partition of a run, by record name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// No link, or the link is an email address
    pub no_link: Vec<String>,

    pub active: Vec<String>,

    /// Dead, unknown, or skipped as already broken
    pub inactive: Vec<String>,

    /// Written back to the store (or, in a dry run, would have been)
    pub updated: Vec<String>,

    pub failed_updates: Vec<String>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.no_link.len() + self.active.len() + self.inactive.len()
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,

    pub records: Vec<FinalPerkRecord>,

    pub summary: BatchSummary,

    /// Stopped early by cancellation
    pub cancelled: bool,
}

impl BatchReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            records: Vec::new(),
            summary: BatchSummary::default(),
            cancelled: false,
        }
    }
}

/// Sequential batch over every record in the store.
pub struct BatchRunner {
    store: Arc<dyn RecordStore>,
    liveness: LivenessClassifier,
    crawler: Option<CrawlAndDecide>,
    config: BatchConfig,
    completed: HashSet<String>,
    cancel: CancellationToken,
}

impl BatchRunner {
    pub fn new(store: Arc<dyn RecordStore>, liveness: LivenessClassifier, config: BatchConfig) -> Self {
        Self {
            store,
            liveness,
            crawler: None,
            config,
            completed: HashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Crawler for live records. Without one, runs are status-only.
    ///
    /// The crawler takes this batch's monetary strategy.
    pub fn with_crawler(mut self, crawler: CrawlAndDecide) -> Self {
        self.crawler = Some(crawler.with_monetary_strategy(self.config.monetary_strategy));
        self
    }

    /// Record ids finished by an earlier run; they are skipped.
    pub fn with_completed(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.completed = ids.into_iter().collect();
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run the batch. Only a failed `fetch_all` is an error.
    pub async fn run(&self) -> Result<BatchReport> {
        let records = self.store.fetch_all().await?;
        let mut report = BatchReport::new();

        let pending: Vec<InputRecord> = records
            .into_iter()
            .filter(|record| !self.completed.contains(&record.id))
            .take(self.config.limit.unwrap_or(usize::MAX))
            .collect();

        info!(
            run_id = %report.run_id,
            records = pending.len(),
            resumed = self.completed.len(),
            dry_run = self.config.dry_run,
            "Starting batch"
        );

        let mut probed_any = false;
        for record in &pending {
            let will_probe = self.needs_probe(record);
            if let Err(e) = self.checkpoint(will_probe && probed_any).await {
                debug!(record_id = %record.id, error = %e, "Stopping before record");
                report.cancelled = true;
                break;
            }
            probed_any |= will_probe;

            let output = self.process(record, &mut report.summary).await;
            report.records.push(output);
        }

        if report.cancelled {
            warn!(run_id = %report.run_id, processed = report.records.len(), "Batch cancelled");
        }

        info!(
            run_id = %report.run_id,
            no_link = report.summary.no_link.len(),
            active = report.summary.active.len(),
            inactive = report.summary.inactive.len(),
            updated = report.summary.updated.len(),
            failed_updates = report.summary.failed_updates.len(),
            "Batch finished"
        );

        Ok(report)
    }

    fn needs_probe(&self, record: &InputRecord) -> bool {
        !self.skips_as_broken(record)
            && record
                .link()
                .is_some_and(|link| !crate::liveness::is_email(link))
    }

    fn skips_as_broken(&self, record: &InputRecord) -> bool {
        self.config.skip_broken && record.status == RecordStatus::BrokenExpired
    }

    /// Cancellation check before a record, waiting out the inter-record
    /// delay first when `delay` is set.
    async fn checkpoint(&self, delay: bool) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(EnrichmentError::Cancelled);
        }
        if !delay || self.config.inter_record_delay_ms == 0 {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(self.config.inter_record_delay_ms)) => Ok(()),
            _ = self.cancel.cancelled() => Err(EnrichmentError::Cancelled),
        }
    }

    async fn process(&self, record: &InputRecord, summary: &mut BatchSummary) -> FinalPerkRecord {
        if self.skips_as_broken(record) {
            debug!(record_id = %record.id, "Skipping record already marked broken");
            summary.inactive.push(record.name.clone());
            return FinalPerkRecord::unenriched(&record.id, &record.name, LivenessVerdict::Dead);
        }

        let verdict = self.liveness.classify(record.link()).await;
        let mut output = FinalPerkRecord::unenriched(&record.id, &record.name, verdict);

        match verdict {
            LivenessVerdict::NoUrl | LivenessVerdict::IsEmail => {
                summary.no_link.push(record.name.clone())
            }
            LivenessVerdict::Alive => summary.active.push(record.name.clone()),
            LivenessVerdict::Dead | LivenessVerdict::Unknown => {
                summary.inactive.push(record.name.clone())
            }
        }

        let now = Utc::now();
        if verdict.is_alive() && self.config.enrich {
            if let Some(crawler) = &self.crawler {
                let outcome = crawler.run(record).await;
                output = output
                    .with_fields(outcome.merged)
                    .with_visited(outcome.visited)
                    .with_last_updated(now);
            }
        }

        let fields = field_map(record, &output, &self.config, now);
        if fields.is_empty() {
            debug!(record_id = %record.id, "Nothing to write");
            return output;
        }

        let perk_fields = writes_perk_fields(&fields);
        if self.config.dry_run {
            info!(record_id = %record.id, columns = ?fields.keys().collect::<Vec<_>>(), "Dry run, not writing");
            summary.updated.push(record.name.clone());
            return output;
        }

        match self.store.update(&record.id, &fields).await {
            Ok(()) => {
                info!(record_id = %record.id, columns = fields.len(), perk_fields, "Updated record");
                summary.updated.push(record.name.clone());
            }
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Failed to update record");
                summary.failed_updates.push(record.name.clone());
            }
        }

        output
    }
}
