//! Working files for a run.
//!
//! Each run gets its own directory under the results root:
//!
//! ```text
//! results/<run_id>/
//!   scraped_info.json     final records, reloadable with Snapshot::load
//!   scraped_info.txt      the same, human readable
//!   perks_wo_link.txt     one name per line
//!   perks_active.txt
//!   perks_inactive.txt
//!   perks_updated.txt
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::{BatchReport, BatchSummary};
use crate::types::perk::FinalPerkRecord;

pub const RECORDS_JSON: &str = "scraped_info.json";
pub const RECORDS_TEXT: &str = "scraped_info.txt";

/// Persisted state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub run_id: Uuid,

    pub created_at: DateTime<Utc>,

    pub records: Vec<FinalPerkRecord>,

    #[serde(default)]
    pub summary: BatchSummary,
}

impl Snapshot {
    pub fn from_report(report: &BatchReport) -> Self {
        Self {
            run_id: report.run_id,
            created_at: Utc::now(),
            records: report.records.clone(),
            summary: report.summary.clone(),
        }
    }

    /// Carry over records from an earlier run that this run did not redo.
    pub fn with_previous(mut self, previous: Snapshot) -> Self {
        let redone: HashSet<String> = self.records.iter().map(|r| r.record_id.clone()).collect();
        let mut carried: Vec<FinalPerkRecord> = previous
            .records
            .into_iter()
            .filter(|r| !redone.contains(&r.record_id))
            .collect();
        carried.append(&mut self.records);
        self.records = carried;
        self
    }

    /// Read a `scraped_info.json`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Ids of every record in the snapshot.
    pub fn completed_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.records.iter().map(|r| r.record_id.clone())
    }

    /// Human-readable rendering of the records.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            let _ = writeln!(out, "Name: {}", record.name);
            let _ = writeln!(out, "Status: {}", record.verdict);
            for (field, value) in record.fields.iter() {
                let _ = writeln!(out, "{}: {}", field.column_name(), value);
            }
            if !record.visited_urls.is_empty() {
                let _ = writeln!(out, "Visited: {}", record.visited_urls.join(", "));
            }
            out.push('\n');
        }
        out
    }
}

/// Writes snapshots under a results root.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    root: PathBuf,
}

impl SnapshotWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn run_dir(&self, run_id: Uuid) -> PathBuf {
        self.root.join(run_id.to_string())
    }

    /// Write every file for the snapshot. Returns the run directory.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        let dir = self.run_dir(snapshot.run_id);
        tokio::fs::create_dir_all(&dir).await?;

        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(dir.join(RECORDS_JSON), json).await?;
        tokio::fs::write(dir.join(RECORDS_TEXT), snapshot.to_text()).await?;

        let summary = &snapshot.summary;
        for (file, names) in [
            ("perks_wo_link.txt", &summary.no_link),
            ("perks_active.txt", &summary.active),
            ("perks_inactive.txt", &summary.inactive),
            ("perks_updated.txt", &summary.updated),
        ] {
            tokio::fs::write(dir.join(file), name_lines(names)).await?;
        }

        info!(run_id = %snapshot.run_id, dir = %dir.display(), records = snapshot.records.len(), "Wrote snapshot");
        Ok(dir)
    }
}

fn name_lines(names: &[String]) -> String {
    names.iter().map(|n| format!("{}\n", n)).collect()
}
