//! Durable URL record storage
//!
//! The frontier remembers every URL it has ever queued as a
//! `hash -> (url, completed)` record. Records are what make a crawl
//! resumable and what stop a finished page from being fetched again, so
//! writes are flushed before the frontier acts on them.
//!
//! `SledStore` keeps records in a sled embedded database; `MemoryStore` is
//! a plain map for tests and throwaway crawls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors from the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Corrupt key in record store: {0}")]
    CorruptKey(String),
}

/// One discovered URL and whether it has been fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub completed: bool,
}

impl UrlRecord {
    pub fn pending(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            completed: false,
        }
    }

    pub fn completed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            completed: true,
        }
    }
}

/// Key-value mapping from URL hash to record that survives restarts
pub trait RecordStore: Send {
    /// Look up a record by URL hash
    fn get(&self, hash: &str) -> Result<Option<UrlRecord>, StoreError>;

    /// Insert or overwrite a record
    fn set(&mut self, hash: &str, record: &UrlRecord) -> Result<(), StoreError>;

    /// All records, in key order
    fn records(&self) -> Result<Vec<(String, UrlRecord)>, StoreError>;

    /// Number of records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every record
    fn clear(&mut self) -> Result<(), StoreError>;

    /// Make all previous writes durable
    fn flush(&mut self) -> Result<(), StoreError>;

    fn contains(&self, hash: &str) -> Result<bool, StoreError> {
        Ok(self.get(hash)?.is_some())
    }
}

/// Record store backed by a sled database
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path.as_ref())?;
        Ok(Self { db })
    }

    /// Summary counts, used by the progress report
    pub fn progress(&self) -> Result<StoreProgress, StoreError> {
        let mut progress = StoreProgress::default();
        for (_, record) in self.records()? {
            progress.total += 1;
            if record.completed {
                progress.completed += 1;
            }
        }
        Ok(progress)
    }
}

impl RecordStore for SledStore {
    fn get(&self, hash: &str) -> Result<Option<UrlRecord>, StoreError> {
        match self.db.get(hash.as_bytes())? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, hash: &str, record: &UrlRecord) -> Result<(), StoreError> {
        let data = bincode::serialize(record)?;
        self.db.insert(hash.as_bytes(), data)?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<(String, UrlRecord)>, StoreError> {
        self.db
            .iter()
            .map(|entry| {
                let (key, value) = entry?;
                let hash = String::from_utf8(key.to_vec())
                    .map_err(|e| StoreError::CorruptKey(e.to_string()))?;
                let record: UrlRecord = bincode::deserialize(&value)?;
                Ok((hash, record))
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.db.len()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

/// In-memory record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, UrlRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, hash: &str) -> Result<Option<UrlRecord>, StoreError> {
        Ok(self.records.get(hash).cloned())
    }

    fn set(&mut self, hash: &str, record: &UrlRecord) -> Result<(), StoreError> {
        self.records.insert(hash.to_string(), record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<(String, UrlRecord)>, StoreError> {
        Ok(self
            .records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Completed / pending counts over a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreProgress {
    pub total: usize,
    pub completed: usize,
}

impl StoreProgress {
    pub fn pending(&self) -> usize {
        self.total - self.completed
    }

    /// Completed share in percent; zero for an empty store
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}
