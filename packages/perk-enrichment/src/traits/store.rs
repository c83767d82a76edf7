//! Record store trait.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::Result;
use crate::types::record::InputRecord;

/// Column name to value, in write order.
pub type FieldMap = IndexMap<String, serde_json::Value>;

/// Tabular store holding the perk records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read every record.
    async fn fetch_all(&self) -> Result<Vec<InputRecord>>;

    /// Write a partial set of columns for one record.
    async fn update(&self, id: &str, fields: &FieldMap) -> Result<()>;
}
