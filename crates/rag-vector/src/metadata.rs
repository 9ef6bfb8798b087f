//! Passage storage.
//!
//! Maps vector IDs (u64) to the passage text and metadata they were embedded
//! from. Stored in RocksDB next to the HNSW file.

use std::path::Path;

use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rag_types::Passage;

use crate::error::VectorError;

/// Column family holding passages keyed by vector ID
pub const CF_PASSAGES: &str = "passages";

/// A passage as persisted alongside its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPassage {
    pub vector_id: u64,
    pub passage: Passage,
    /// Ingestion time (ms since epoch)
    pub indexed_at: i64,
}

impl StoredPassage {
    pub fn new(vector_id: u64, passage: Passage) -> Self {
        Self {
            vector_id,
            passage,
            indexed_at: Utc::now().timestamp_millis(),
        }
    }
}

/// Passage storage using RocksDB.
pub struct PassageStore {
    db: DB,
}

impl PassageStore {
    /// Open or create passage storage.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VectorError> {
        let path = path.as_ref();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_PASSAGES, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        info!(path = ?path, "Opened passage store");
        Ok(Self { db })
    }

    fn cf(&self) -> Result<&ColumnFamily, VectorError> {
        self.db
            .cf_handle(CF_PASSAGES)
            .ok_or_else(|| VectorError::Index(format!("column family {} missing", CF_PASSAGES)))
    }

    pub fn put(&self, entry: &StoredPassage) -> Result<(), VectorError> {
        let key = entry.vector_id.to_be_bytes();
        let value =
            serde_json::to_vec(entry).map_err(|e| VectorError::Serialization(e.to_string()))?;

        self.db.put_cf(self.cf()?, key, value)?;
        debug!(vector_id = entry.vector_id, "Stored passage");
        Ok(())
    }

    pub fn get(&self, vector_id: u64) -> Result<Option<StoredPassage>, VectorError> {
        let key = vector_id.to_be_bytes();
        match self.db.get_cf(self.cf()?, key)? {
            Some(bytes) => {
                let entry: StoredPassage = serde_json::from_slice(&bytes)
                    .map_err(|e| VectorError::Serialization(e.to_string()))?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    pub fn count(&self) -> Result<usize, VectorError> {
        let iter = self.db.iterator_cf(self.cf()?, IteratorMode::Start);
        Ok(iter.count())
    }

    /// Next unused vector ID (one past the highest stored key).
    pub fn next_id(&self) -> Result<u64, VectorError> {
        let mut iter = self.db.iterator_cf(self.cf()?, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _) = item?;
                let bytes: [u8; 8] = key.as_ref().try_into().map_err(|_| {
                    VectorError::Serialization(format!("bad passage key length {}", key.len()))
                })?;
                Ok(u64::from_be_bytes(bytes) + 1)
            }
            None => Ok(0),
        }
    }
}
