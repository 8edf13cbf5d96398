//! # Retrieval Module
//!
//! ## Purpose
//! Similarity search over the persistent chunk index: plain top-`k` nearest
//! neighbors by cosine similarity, and diversity-aware max-marginal-relevance
//! selection over a wider candidate pool.
//!
//! ## Input/Output Specification
//! - **Input**: Query embedding, `k`, optional `fetch_k` candidate pool size
//! - **Output**: `RetrievedChunk` values with stored text, identifier and score
//! - **Errors**: A stored embedding whose dimension differs from the query's
//!   is reported explicitly instead of being scored

use crate::config::RetrievalConfig;
use crate::errors::{RagError, Result};
use crate::index::store::{IndexEntry, IndexStore};
use serde::Serialize;
use tracing::debug;

/// One retrieved chunk with its relevance score
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// Chunk identifier, usable as a citation
    pub id: String,
    /// Stored chunk text
    pub text: String,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Search over the chunk index
pub struct Retriever<'a> {
    store: &'a IndexStore,
    config: RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(store: &'a IndexStore, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    /// Top-`k` chunks by cosine similarity to the query embedding.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let mut scored = self.score_all(query)?;
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        debug!(k, results = scored.len(), "Similarity search complete");
        Ok(scored
            .into_iter()
            .map(|(entry, score)| RetrievedChunk {
                id: entry.id,
                text: entry.text,
                score,
            })
            .collect())
    }

    /// Diversity-aware search: greedy max-marginal-relevance over the
    /// `fetch_k` most similar candidates. Each step picks the candidate that
    /// maximizes `lambda * relevance - (1 - lambda) * max_similarity_to_picked`.
    pub fn mmr_search(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>> {
        let fetch_k = fetch_k.unwrap_or(self.config.default_fetch_k).max(k);
        let lambda = self.config.mmr_lambda;

        let mut pool = self.score_all(query)?;
        pool.sort_by(|a, b| b.1.total_cmp(&a.1));
        pool.truncate(fetch_k);

        let mut picked: Vec<(IndexEntry, f32)> = Vec::with_capacity(k);
        while picked.len() < k && !pool.is_empty() {
            let mut best_idx = 0;
            let mut best_score = f32::NEG_INFINITY;
            for (idx, (candidate, relevance)) in pool.iter().enumerate() {
                let redundancy = picked
                    .iter()
                    .map(|(p, _)| cosine_similarity(&candidate.embedding, &p.embedding))
                    .fold(0.0f32, f32::max);
                let marginal = lambda * relevance - (1.0 - lambda) * redundancy;
                if marginal > best_score {
                    best_score = marginal;
                    best_idx = idx;
                }
            }
            picked.push(pool.remove(best_idx));
        }

        debug!(k, fetch_k, results = picked.len(), "MMR search complete");
        Ok(picked
            .into_iter()
            .map(|(entry, score)| RetrievedChunk {
                id: entry.id,
                text: entry.text,
                score,
            })
            .collect())
    }

    /// Score every stored entry against the query embedding.
    fn score_all(&self, query: &[f32]) -> Result<Vec<(IndexEntry, f32)>> {
        let entries = self.store.all_entries()?;
        let mut scored = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.embedding.len() != query.len() {
                return Err(RagError::EmbeddingDimensionMismatch {
                    entry_id: entry.id,
                    query_dim: query.len(),
                    entry_dim: entry.embedding.len(),
                });
            }
            let score = cosine_similarity(query, &entry.embedding);
            scored.push((entry, score));
        }
        Ok(scored)
    }
}

/// Cosine similarity of two equal-length vectors; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;

    fn retrieval_config() -> RetrievalConfig {
        RetrievalConfig {
            default_k: 3,
            default_fetch_k: 10,
            mmr_lambda: 0.5,
        }
    }

    fn store_with(entries: Vec<IndexEntry>) -> (tempfile::TempDir, IndexStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(&IndexConfig {
            db_path: dir.path().join("index"),
            enable_compression: false,
        })
        .unwrap();
        store.insert_batch(&entries).unwrap();
        (dir, store)
    }

    fn entry(id: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            source: "a.pdf".to_string(),
            page: 0,
            text: format!("text for {id}"),
            embedding,
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn similarity_search_ranks_by_closeness() {
        let (_dir, store) = store_with(vec![
            entry("a.pdf:0:0", vec![1.0, 0.0]),
            entry("a.pdf:0:1", vec![0.9, 0.1]),
            entry("a.pdf:0:2", vec![0.0, 1.0]),
        ]);
        let retriever = Retriever::new(&store, retrieval_config());

        let results = retriever.similarity_search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a.pdf:0:0");
        assert_eq!(results[1].id, "a.pdf:0:1");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn dimension_mismatch_is_explicit() {
        let (_dir, store) = store_with(vec![entry("a.pdf:0:0", vec![1.0, 0.0, 0.0])]);
        let retriever = Retriever::new(&store, retrieval_config());

        let err = retriever.similarity_search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, RagError::EmbeddingDimensionMismatch { .. }));
    }

    #[test]
    fn mmr_prefers_diverse_results() {
        // Two near-duplicates close to the query plus one distinct but still
        // relevant vector: plain top-2 returns the duplicates, MMR should
        // swap one of them for the distinct vector.
        let (_dir, store) = store_with(vec![
            entry("a.pdf:0:0", vec![0.9, 0.1]),
            entry("a.pdf:0:1", vec![0.9, 0.11]),
            entry("a.pdf:0:2", vec![0.8, -0.6]),
        ]);
        let retriever = Retriever::new(&store, retrieval_config());

        let plain = retriever.similarity_search(&[1.0, 0.0], 2).unwrap();
        let plain_ids: Vec<&str> = plain.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(plain_ids, vec!["a.pdf:0:0", "a.pdf:0:1"]);

        let diverse = retriever.mmr_search(&[1.0, 0.0], 2, None).unwrap();
        let diverse_ids: Vec<&str> = diverse.iter().map(|r| r.id.as_str()).collect();
        assert!(diverse_ids.contains(&"a.pdf:0:0"));
        assert!(diverse_ids.contains(&"a.pdf:0:2"));
    }

    #[test]
    fn mmr_caps_results_at_pool_size() {
        let (_dir, store) = store_with(vec![entry("a.pdf:0:0", vec![1.0, 0.0])]);
        let retriever = Retriever::new(&store, retrieval_config());
        let results = retriever.mmr_search(&[1.0, 0.0], 5, Some(10)).unwrap();
        assert_eq!(results.len(), 1);
    }
}
