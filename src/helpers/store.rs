use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::models::record::StoredRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request to the record store failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("record store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response from the record store: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("record store is misconfigured: {0}")]
    Config(String),
}

/// Minimal row-list contract shared by the remote sheet and the in-process
/// store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every stored row, in store order.
    async fn fetch(&self) -> Result<Vec<StoredRecord>, StoreError>;

    async fn append(&self, record: StoredRecord) -> Result<(), StoreError>;

    /// Overwrites the whole dataset.
    async fn replace(&self, records: Vec<StoredRecord>) -> Result<(), StoreError>;

    /// Like [`fetch`](Self::fetch), but a failing store reads as empty.
    async fn read(&self) -> Vec<StoredRecord> {
        match self.fetch().await {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to read records, falling back to an empty set: {}", e);
                Vec::new()
            }
        }
    }

    /// Keeps one row per date: a row with the same date text is overwritten,
    /// otherwise the record is appended.
    async fn upsert(&self, record: StoredRecord) -> Result<(), StoreError> {
        let mut records = self.fetch().await?;

        match records.iter().position(|r| r.date.trim() == record.date.trim()) {
            Some(index) => {
                info!("Replacing existing record for {}", record.date);
                let date = record.date.trim().to_string();
                let mut seen = false;
                // drop older duplicates; the first match stays at `index`
                records.retain(|r| {
                    if r.date.trim() != date {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
                records[index] = record;
                self.replace(records).await
            }
            None => self.append(record).await,
        }
    }
}

/// Session-local store. Holds rows in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<StoredRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self) -> Result<Vec<StoredRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn append(&self, record: StoredRecord) -> Result<(), StoreError> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn replace(&self, records: Vec<StoredRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            warn!("Clearing all records from the in-memory store");
        }
        *self.records.write().await = records;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, note: &str) -> StoredRecord {
        StoredRecord {
            date: date.into(),
            note: note.into(),
            ..StoredRecord::default()
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn fetch(&self) -> Result<Vec<StoredRecord>, StoreError> {
            Err(StoreError::Config("offline".into()))
        }

        async fn append(&self, _record: StoredRecord) -> Result<(), StoreError> {
            Err(StoreError::Config("offline".into()))
        }

        async fn replace(&self, _records: Vec<StoredRecord>) -> Result<(), StoreError> {
            Err(StoreError::Config("offline".into()))
        }
    }

    #[tokio::test]
    async fn append_and_replace_round_trip() {
        let store = MemoryStore::new();
        store.append(record("01/03/2026", "a")).await.unwrap();
        store.append(record("02/03/2026", "b")).await.unwrap();
        assert_eq!(store.read().await.len(), 2);

        store.replace(vec![record("03/03/2026", "c")]).await.unwrap();
        assert_eq!(store.read().await, vec![record("03/03/2026", "c")]);

        store.replace(Vec::new()).await.unwrap();
        assert!(store.read().await.is_empty());
    }

    #[tokio::test]
    async fn upsert_overwrites_the_same_date() {
        let store = MemoryStore::new();
        store.upsert(record("01/03/2026", "first")).await.unwrap();
        store.upsert(record("02/03/2026", "other")).await.unwrap();
        store.upsert(record("01/03/2026", "corrected")).await.unwrap();

        let records = store.read().await;
        assert_eq!(records, vec![record("01/03/2026", "corrected"), record("02/03/2026", "other")]);
    }

    #[tokio::test]
    async fn upsert_collapses_legacy_duplicates() {
        let store = MemoryStore::with_records(vec![
            record("01/03/2026", "dup 1"),
            record("02/03/2026", "keep"),
            record("01/03/2026", "dup 2"),
        ]);
        store.upsert(record("01/03/2026", "fixed")).await.unwrap();

        assert_eq!(store.read().await, vec![record("01/03/2026", "fixed"), record("02/03/2026", "keep")]);
    }

    #[tokio::test]
    async fn failing_reads_fall_back_to_empty() {
        let store = BrokenStore;

        assert!(store.read().await.is_empty());
        assert!(store.fetch().await.is_err());
        assert!(store.upsert(record("01/03/2026", "x")).await.is_err());
    }
}
