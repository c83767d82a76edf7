//! Batch pipeline - liveness, enrichment and store write-back.
//!
//! The public API:
//! - [`BatchRunner`] - runs every record in the store once
//! - [`status_for`] / [`field_map`] - verdict and field to column mapping

pub mod batch;
pub mod mapping;

pub use batch::{BatchReport, BatchRunner, BatchSummary};
pub use mapping::{field_map, status_for, writes_perk_fields, LINK_COLUMN, NAME_COLUMN, STATUS_COLUMN};
