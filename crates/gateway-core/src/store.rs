//! Read-only prompt lookup

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::PromptRecord;

/// Storage lookup failure
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be queried
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The query ran but failed
    #[error("Query failed: {0}")]
    Query(String),
}

/// Read-only prompt lookup keyed by numeric id.
///
/// Implemented by the embedding application over its database.
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Fetch a single prompt, `None` if the row does not exist.
    async fn get_prompt_by_id(&self, id: i64) -> Result<Option<PromptRecord>, StoreError>;

    /// Fetch every existing prompt among `ids`. Missing ids are omitted.
    async fn get_prompts_by_ids(&self, ids: &[i64]) -> Result<Vec<PromptRecord>, StoreError>;
}

/// Prompt store held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryPromptStore {
    prompts: RwLock<BTreeMap<i64, PromptRecord>>,
}

impl InMemoryPromptStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records; a repeated id keeps the last record.
    pub fn from_records(records: impl IntoIterator<Item = PromptRecord>) -> Self {
        let prompts = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            prompts: RwLock::new(prompts),
        }
    }

    /// Insert or replace a record
    pub fn upsert(&self, record: PromptRecord) {
        self.prompts.write().insert(record.id, record);
    }

    /// Remove a record, returning it if present
    pub fn remove(&self, id: i64) -> Option<PromptRecord> {
        self.prompts.write().remove(&id)
    }

    /// Number of stored prompts
    #[must_use]
    pub fn len(&self) -> usize {
        self.prompts.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prompts.read().is_empty()
    }
}

#[async_trait]
impl PromptStore for InMemoryPromptStore {
    async fn get_prompt_by_id(&self, id: i64) -> Result<Option<PromptRecord>, StoreError> {
        Ok(self.prompts.read().get(&id).cloned())
    }

    async fn get_prompts_by_ids(&self, ids: &[i64]) -> Result<Vec<PromptRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let prompts = self.prompts.read();
        Ok(ids.iter().filter_map(|id| prompts.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryPromptStore {
        InMemoryPromptStore::from_records([
            PromptRecord::new(1, "One", "first"),
            PromptRecord::new(2, "Two", "second"),
            PromptRecord::new(3, "Three", "third"),
        ])
    }

    #[tokio::test]
    async fn get_by_id_hits_and_misses() {
        let store = store();
        assert_eq!(store.get_prompt_by_id(2).await.unwrap().unwrap().title, "Two");
        assert!(store.get_prompt_by_id(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_by_ids_keeps_request_order_and_skips_missing() {
        let store = store();
        let rows = store.get_prompts_by_ids(&[3, 7, 1]).await.unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn get_by_ids_empty_input() {
        assert!(store().get_prompts_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_makes_row_disappear() {
        let store = store();
        assert!(store.remove(1).is_some());
        assert!(store.get_prompt_by_id(1).await.unwrap().is_none());
        assert_eq!(store.len(), 2);
    }
}
