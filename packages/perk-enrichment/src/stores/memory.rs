//! In-memory record store for testing and dry runs.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::error::{EnrichmentError, Result};
use crate::pipeline::mapping::STATUS_COLUMN;
use crate::traits::store::{FieldMap, RecordStore};
use crate::types::{
    perk::{FieldValue, PerkField},
    record::{InputRecord, RecordStatus},
};

/// In-memory store holding records in insertion order.
///
/// Updates are applied to the held records and also kept as a log for
/// assertions. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<Vec<InputRecord>>>,
    updates: Arc<RwLock<Vec<(String, FieldMap)>>>,
    failing_updates: Arc<RwLock<HashSet<String>>>,
    fail_fetch: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `fetch_all` fails.
    pub fn unreachable() -> Self {
        Self {
            fail_fetch: true,
            ..Default::default()
        }
    }

    pub fn with_record(self, record: InputRecord) -> Self {
        self.records.write().unwrap().push(record);
        self
    }

    /// Make every update of `id` fail.
    pub fn with_failing_update(self, id: impl Into<String>) -> Self {
        self.failing_updates.write().unwrap().insert(id.into());
        self
    }

    pub fn records(&self) -> Vec<InputRecord> {
        self.records.read().unwrap().clone()
    }

    pub fn get(&self, id: &str) -> Option<InputRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    /// Successful updates, in order.
    pub fn updates(&self) -> Vec<(String, FieldMap)> {
        self.updates.read().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.read().unwrap().len()
    }
}

fn apply(record: &mut InputRecord, fields: &FieldMap) {
    for (column, value) in fields {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        if column == STATUS_COLUMN {
            record.status = RecordStatus::parse(&text);
        } else if let Some(field) = PerkField::ALL.iter().find(|f| f.column_name() == column.as_str()) {
            record.prior.set(*field, FieldValue::from_legacy(&text));
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<InputRecord>> {
        if self.fail_fetch {
            return Err(EnrichmentError::Store("memory store marked unreachable".into()));
        }
        Ok(self.records())
    }

    async fn update(&self, id: &str, fields: &FieldMap) -> Result<()> {
        if self.failing_updates.read().unwrap().contains(id) {
            return Err(EnrichmentError::Store(format!("update of {} rejected", id).into()));
        }

        let mut records = self.records.write().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| EnrichmentError::Store(format!("no record with id {}", id).into()))?;
        apply(record, fields);
        drop(records);

        self.updates
            .write()
            .unwrap()
            .push((id.to_string(), fields.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn test_update_applies_columns() {
        let store = MemoryStore::new().with_record(InputRecord::new("r1", "Acme"));

        let mut fields = FieldMap::new();
        fields.insert("Status".into(), Value::from("active"));
        fields.insert("Value".into(), Value::from(5000u64));
        fields.insert("What you get".into(), Value::from("Credits"));
        store.update("r1", &fields).await.unwrap();

        let record = store.get("r1").unwrap();
        assert_eq!(record.status, RecordStatus::Active);
        assert_eq!(record.prior.monetary_value, FieldValue::found("5000"));
        assert_eq!(record.prior.benefit_summary, FieldValue::found("Credits"));
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_failures() {
        let store = MemoryStore::new()
            .with_record(InputRecord::new("r1", "Acme"))
            .with_failing_update("r1");
        assert!(store.update("r1", &FieldMap::new()).await.is_err());
        assert!(store.update("missing", &FieldMap::new()).await.is_err());
        assert_eq!(store.update_count(), 0);

        assert!(MemoryStore::unreachable().fetch_all().await.is_err());
    }
}
