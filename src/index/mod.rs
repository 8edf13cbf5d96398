//! # Indexing Module
//!
//! ## Purpose
//! Assigns stable identifiers to ordered chunk sequences and synchronizes the
//! persistent index incrementally: only chunks whose identifier is not already
//! stored are embedded and inserted.
//!
//! ## Input/Output Specification
//! - **Input**: Ordered chunks grouped by `(source, page)`
//! - **Output**: Identified chunks; an `IndexReport` per synchronization pass
//! - **Guarantee**: Identifier assignment is pure and deterministic;
//!   synchronization over unchanged input inserts nothing
//!
//! ## Identifier Format
//! `{source}:{page}:{ordinal}` where the ordinal counts chunks within one
//! contiguous `(source, page)` run, restarting at zero when the run changes.

pub mod store;

use crate::embedding::Embedder;
use crate::errors::Result;
use crate::{Chunk, IdentifiedChunk};
use store::{IndexEntry, IndexStore};
use tracing::{debug, info};

/// Assign identifiers to an ordered chunk sequence.
///
/// The ordinal counter tracks the last seen `{source}:{page}` pair: it
/// increments while the pair repeats and restarts at zero when it changes.
/// Input is assumed to be grouped by page in page order; interleaved groups
/// would restart the counter and are not defended against.
pub fn assign_chunk_ids(chunks: Vec<Chunk>) -> Vec<IdentifiedChunk> {
    let mut last_page_id: Option<String> = None;
    let mut ordinal = 0usize;

    chunks
        .into_iter()
        .map(|chunk| {
            let page_id = format!("{}:{}", chunk.source, chunk.page);
            if last_page_id.as_deref() == Some(page_id.as_str()) {
                ordinal += 1;
            } else {
                ordinal = 0;
            }
            let id = format!("{}:{}", page_id, ordinal);
            last_page_id = Some(page_id);
            IdentifiedChunk { id, chunk }
        })
        .collect()
}

/// Result of one index synchronization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Chunks presented to the pass
    pub presented: usize,
    /// Chunks already stored and skipped
    pub skipped: usize,
    /// Chunks embedded and inserted
    pub inserted: usize,
}

/// Synchronizes identified chunks into the persistent index
pub struct IncrementalIndexer<'a> {
    store: &'a IndexStore,
    embedder: &'a dyn Embedder,
}

impl<'a> IncrementalIndexer<'a> {
    pub fn new(store: &'a IndexStore, embedder: &'a dyn Embedder) -> Self {
        Self { store, embedder }
    }

    /// Synchronize a chunk sequence into the store.
    ///
    /// Reads the stored identifier set (metadata only), partitions the input
    /// into present and new, then embeds and inserts only the new chunks in
    /// their original order. When nothing is new, no insertion call is made.
    /// Errors propagate to the caller; a failed pass can simply be re-run
    /// since completed insertions are skipped next time.
    pub async fn sync(&self, chunks: Vec<IdentifiedChunk>) -> Result<IndexReport> {
        let presented = chunks.len();
        let existing = self.store.existing_ids()?;
        debug!(existing = existing.len(), presented, "Starting index sync");

        let new_chunks: Vec<IdentifiedChunk> = chunks
            .into_iter()
            .filter(|c| !existing.contains(&c.id))
            .collect();
        let skipped = presented - new_chunks.len();

        if new_chunks.is_empty() {
            info!(presented, "Index already up to date");
            return Ok(IndexReport {
                presented,
                skipped,
                inserted: 0,
            });
        }

        let mut inserted = 0usize;
        for batch in new_chunks.chunks(self.embedder.batch_size()) {
            let texts: Vec<String> = batch.iter().map(|c| c.chunk.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            let entries: Vec<IndexEntry> = batch
                .iter()
                .zip(embeddings)
                .map(|(c, embedding)| IndexEntry {
                    id: c.id.clone(),
                    source: c.chunk.source.clone(),
                    page: c.chunk.page,
                    text: c.chunk.text.clone(),
                    embedding,
                })
                .collect();
            self.store.insert_batch(&entries)?;
            inserted += entries.len();
        }

        info!(presented, skipped, inserted, "Index sync complete");
        Ok(IndexReport {
            presented,
            skipped,
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, page: usize, text: &str) -> Chunk {
        Chunk {
            source: source.to_string(),
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn ordinals_count_within_a_page_run() {
        let identified = assign_chunk_ids(vec![
            chunk("A.pdf", 0, "a"),
            chunk("A.pdf", 0, "b"),
            chunk("A.pdf", 0, "c"),
            chunk("A.pdf", 1, "d"),
        ]);
        let ids: Vec<&str> = identified.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A.pdf:0:0", "A.pdf:0:1", "A.pdf:0:2", "A.pdf:1:0"]);
    }

    #[test]
    fn counter_restarts_when_source_changes() {
        let identified = assign_chunk_ids(vec![
            chunk("A.pdf", 1, "a"),
            chunk("B.pdf", 1, "b"),
            chunk("B.pdf", 1, "c"),
        ]);
        let ids: Vec<&str> = identified.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A.pdf:1:0", "B.pdf:1:0", "B.pdf:1:1"]);
    }

    #[test]
    fn assignment_is_deterministic() {
        let input = vec![
            chunk("A.pdf", 0, "a"),
            chunk("A.pdf", 0, "b"),
            chunk("A.pdf", 3, "c"),
        ];
        let first = assign_chunk_ids(input.clone());
        let second = assign_chunk_ids(input);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_yields_no_ids() {
        assert!(assign_chunk_ids(Vec::new()).is_empty());
    }
}
