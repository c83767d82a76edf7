//! Input records and liveness verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::perk::PartialPerkRecord;

/// Last-known status held by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Unknown,
    Active,
    BrokenExpired,
}

impl RecordStatus {
    /// Parse the store's free-form status text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => RecordStatus::Active,
            "broken/expired" => RecordStatus::BrokenExpired,
            _ => RecordStatus::Unknown,
        }
    }

    /// Spelling written back to the store. `Unknown` is never written.
    pub fn as_store_str(self) -> Option<&'static str> {
        match self {
            RecordStatus::Active => Some("active"),
            RecordStatus::BrokenExpired => Some("broken/expired"),
            RecordStatus::Unknown => None,
        }
    }
}

/// One row read from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    /// Opaque identity key
    pub id: String,

    /// Display name
    pub name: String,

    /// Link as stored; may be missing, schemeless or an email address
    pub url: Option<String>,

    pub status: RecordStatus,

    /// Stale perk fields from the previous run
    #[serde(default)]
    pub prior: PartialPerkRecord,
}

impl InputRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: None,
            status: RecordStatus::Unknown,
            prior: PartialPerkRecord::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_prior(mut self, prior: PartialPerkRecord) -> Self {
        self.prior = prior;
        self
    }

    /// The link, if it has any non-blank text.
    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Outcome of classifying a record's link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessVerdict {
    Alive,
    Dead,
    /// Every strategy failed without a definitive answer
    Unknown,
    NoUrl,
    IsEmail,
}

impl LivenessVerdict {
    pub fn is_alive(self) -> bool {
        self == LivenessVerdict::Alive
    }
}

impl fmt::Display for LivenessVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LivenessVerdict::Alive => "alive",
            LivenessVerdict::Dead => "dead",
            LivenessVerdict::Unknown => "unknown",
            LivenessVerdict::NoUrl => "no url",
            LivenessVerdict::IsEmail => "email",
        };
        f.write_str(s)
    }
}
