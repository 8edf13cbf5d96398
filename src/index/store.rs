//! # Index Storage Module
//!
//! ## Purpose
//! Persistent, file-backed storage for indexed chunk entries. Entries are
//! append-only: created once, never mutated, and removed only by destroying
//! the storage location entirely.
//!
//! ## Input/Output Specification
//! - **Input**: `IndexEntry` values keyed by chunk identifier
//! - **Output**: Entries by identifier, the full identifier set, entry scans
//! - **Storage**: Sled embedded database, bincode encoding, optional gzip
//!   compression of stored chunk text
//!
//! ## Key Features
//! - Metadata-only identifier scan for the incremental indexing decision
//! - Batch insert of new entries
//! - Destroy-by-path as the only clear operation

use crate::config::IndexConfig;
use crate::errors::{RagError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// One indexed chunk: identifier, provenance, text and embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Identifier in the form `{source}:{page}:{ordinal}`
    pub id: String,
    /// Source document label
    pub source: String,
    /// Zero-based page index
    pub page: usize,
    /// Chunk text (stored compressed when compression is enabled)
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// Stored representation; text is kept separately so it can be compressed
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    source: String,
    page: usize,
    text_bytes: Vec<u8>,
    text_compressed: bool,
    embedding: Vec<f32>,
}

/// Sled-backed persistent chunk index
pub struct IndexStore {
    db: sled::Db,
    entries: sled::Tree,
    enable_compression: bool,
}

impl IndexStore {
    /// Open (or create) the index at the configured path.
    pub fn open(config: &IndexConfig) -> Result<Self> {
        let db = sled::open(&config.db_path).map_err(|e| RagError::StoreConnectionFailed {
            db_path: config.db_path.display().to_string(),
            reason: e.to_string(),
        })?;
        let entries = db.open_tree("chunk_entries")?;

        info!(
            db_path = %config.db_path.display(),
            entries = entries.len(),
            "Opened chunk index"
        );
        Ok(Self {
            db,
            entries,
            enable_compression: config.enable_compression,
        })
    }

    /// Identifiers of every stored entry. Decodes nothing but keys, so the
    /// incremental indexing decision never touches embeddings or text.
    pub fn existing_ids(&self) -> Result<HashSet<String>> {
        let mut ids = HashSet::with_capacity(self.entries.len());
        for key in self.entries.iter().keys() {
            let key = key?;
            let id = String::from_utf8(key.to_vec()).map_err(|e| RagError::Storage {
                details: format!("non-UTF8 entry key: {}", e),
            })?;
            ids.insert(id);
        }
        Ok(ids)
    }

    /// Insert a batch of new entries.
    pub fn insert_batch(&self, batch: &[IndexEntry]) -> Result<()> {
        for entry in batch {
            let stored = self.encode(entry)?;
            let bytes = bincode::serialize(&stored)?;
            self.entries.insert(entry.id.as_bytes(), bytes)?;
        }
        self.entries.flush()?;
        debug!(inserted = batch.len(), "Inserted index entries");
        Ok(())
    }

    /// Fetch one entry by identifier.
    pub fn get(&self, id: &str) -> Result<Option<IndexEntry>> {
        match self.entries.get(id.as_bytes())? {
            Some(bytes) => {
                let stored: StoredEntry = bincode::deserialize(&bytes)?;
                Ok(Some(self.decode(id, stored)?))
            }
            None => Ok(None),
        }
    }

    /// Decode and yield every stored entry.
    pub fn all_entries(&self) -> Result<Vec<IndexEntry>> {
        let mut out = Vec::with_capacity(self.entries.len());
        for item in self.entries.iter() {
            let (key, bytes) = item?;
            let id = String::from_utf8(key.to_vec()).map_err(|e| RagError::Storage {
                details: format!("non-UTF8 entry key: {}", e),
            })?;
            let stored: StoredEntry = bincode::deserialize(&bytes)?;
            out.push(self.decode(&id, stored)?);
        }
        Ok(out)
    }

    /// Number of stored entries.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// On-disk size of the index in bytes.
    pub fn size_on_disk(&self) -> Result<u64> {
        Ok(self.db.size_on_disk()?)
    }

    /// Verify the store responds to reads.
    pub fn health_check(&self) -> Result<()> {
        self.entries.first()?;
        Ok(())
    }

    /// Destroy the index at `path`. This is the only supported clear
    /// operation; it must be called without an open handle on the path.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_dir_all(path)?;
            info!(db_path = %path.display(), "Destroyed chunk index");
        }
        Ok(())
    }

    fn encode(&self, entry: &IndexEntry) -> Result<StoredEntry> {
        let (text_bytes, text_compressed) = if self.enable_compression {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(entry.text.as_bytes())
                .and_then(|_| encoder.finish())
                .map(|bytes| (bytes, true))
                .map_err(|e| RagError::Storage {
                    details: format!("text compression failed: {}", e),
                })?
        } else {
            (entry.text.as_bytes().to_vec(), false)
        };
        Ok(StoredEntry {
            source: entry.source.clone(),
            page: entry.page,
            text_bytes,
            text_compressed,
            embedding: entry.embedding.clone(),
        })
    }

    fn decode(&self, id: &str, stored: StoredEntry) -> Result<IndexEntry> {
        let text = if stored.text_compressed {
            let mut decoder = GzDecoder::new(stored.text_bytes.as_slice());
            let mut text = String::new();
            decoder
                .read_to_string(&mut text)
                .map_err(|e| RagError::Storage {
                    details: format!("text decompression failed for '{}': {}", id, e),
                })?;
            text
        } else {
            String::from_utf8(stored.text_bytes).map_err(|e| RagError::Storage {
                details: format!("non-UTF8 stored text for '{}': {}", id, e),
            })?
        };
        Ok(IndexEntry {
            id: id.to_string(),
            source: stored.source,
            page: stored.page,
            text,
            embedding: stored.embedding,
        })
    }
}
