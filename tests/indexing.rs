//! End-to-end tests of chunk identity assignment and incremental index
//! synchronization against an on-disk store.

use legal_rag_engine::config::{IndexConfig, RetrievalConfig};
use legal_rag_engine::embedding::DeterministicEmbedder;
use legal_rag_engine::index::store::IndexStore;
use legal_rag_engine::index::{assign_chunk_ids, IncrementalIndexer};
use legal_rag_engine::retrieval::Retriever;
use legal_rag_engine::Chunk;
use std::collections::HashSet;
use std::path::Path;

fn chunk(source: &str, page: usize, text: &str) -> Chunk {
    Chunk {
        source: source.to_string(),
        page,
        text: text.to_string(),
    }
}

/// A.pdf: page 0 yields three chunks, page 1 yields one.
fn corpus_a() -> Vec<Chunk> {
    vec![
        chunk("A.pdf", 0, "The lessor shall maintain the premises."),
        chunk("A.pdf", 0, "The lessee shall pay rent monthly."),
        chunk("A.pdf", 0, "Late payment accrues interest."),
        chunk("A.pdf", 1, "Either party may terminate with notice."),
    ]
}

/// B.pdf: page 0 yields two chunks.
fn corpus_b() -> Vec<Chunk> {
    vec![
        chunk("B.pdf", 0, "Disputes go to arbitration."),
        chunk("B.pdf", 0, "The arbitration seat is fixed."),
    ]
}

fn open_store(path: &Path) -> IndexStore {
    IndexStore::open(&IndexConfig {
        db_path: path.to_path_buf(),
        enable_compression: true,
    })
    .unwrap()
}

#[test]
fn worked_example_identifier_assignment() {
    let ids: Vec<String> = assign_chunk_ids(corpus_a())
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(
        ids,
        vec!["A.pdf:0:0", "A.pdf:0:1", "A.pdf:0:2", "A.pdf:1:0"]
    );
}

#[tokio::test]
async fn initial_sync_inserts_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("index"));
    let embedder = DeterministicEmbedder::new(16);
    let indexer = IncrementalIndexer::new(&store, &embedder);

    let report = indexer.sync(assign_chunk_ids(corpus_a())).await.unwrap();
    assert_eq!(report.presented, 4);
    assert_eq!(report.inserted, 4);
    assert_eq!(report.skipped, 0);
    assert_eq!(store.count(), 4);
}

#[tokio::test]
async fn resync_over_unchanged_input_inserts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("index"));
    let embedder = DeterministicEmbedder::new(16);
    let indexer = IncrementalIndexer::new(&store, &embedder);

    indexer.sync(assign_chunk_ids(corpus_a())).await.unwrap();
    let before: HashSet<String> = store.existing_ids().unwrap();

    let report = indexer.sync(assign_chunk_ids(corpus_a())).await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.skipped, 4);
    assert_eq!(store.existing_ids().unwrap(), before);
}

#[tokio::test]
async fn superset_sync_inserts_exactly_the_delta() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("index"));
    let embedder = DeterministicEmbedder::new(16);
    let indexer = IncrementalIndexer::new(&store, &embedder);

    indexer.sync(assign_chunk_ids(corpus_a())).await.unwrap();
    let a_entries = store.all_entries().unwrap();

    // Second pass presents A plus B; only B's chunks are new
    let mut combined = corpus_a();
    combined.extend(corpus_b());
    let report = indexer.sync(assign_chunk_ids(combined)).await.unwrap();
    assert_eq!(report.presented, 6);
    assert_eq!(report.inserted, 2);
    assert_eq!(store.count(), 6);

    let ids = store.existing_ids().unwrap();
    assert!(ids.contains("B.pdf:0:0"));
    assert!(ids.contains("B.pdf:0:1"));

    // Prior entries are untouched
    for entry in a_entries {
        let now = store.get(&entry.id).unwrap().unwrap();
        assert_eq!(now, entry);
    }
}

#[tokio::test]
async fn destroy_and_reindex_reproduces_the_identifier_set() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("index");
    let embedder = DeterministicEmbedder::new(16);

    let first_ids: HashSet<String> = {
        let store = open_store(&db_path);
        let indexer = IncrementalIndexer::new(&store, &embedder);
        indexer.sync(assign_chunk_ids(corpus_a())).await.unwrap();
        store.existing_ids().unwrap()
    };

    IndexStore::destroy(&db_path).unwrap();

    let store = open_store(&db_path);
    let indexer = IncrementalIndexer::new(&store, &embedder);
    indexer.sync(assign_chunk_ids(corpus_a())).await.unwrap();
    assert_eq!(store.existing_ids().unwrap(), first_ids);
}

#[tokio::test]
async fn retrieval_finds_the_relevant_indexed_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir.path().join("index"));
    let embedder = DeterministicEmbedder::new(64);
    let indexer = IncrementalIndexer::new(&store, &embedder);

    let mut combined = corpus_a();
    combined.extend(corpus_b());
    indexer.sync(assign_chunk_ids(combined)).await.unwrap();

    use legal_rag_engine::embedding::Embedder;
    let query = embedder
        .embed_query("Disputes go to arbitration.")
        .await
        .unwrap();

    let retriever = Retriever::new(
        &store,
        RetrievalConfig {
            default_k: 3,
            default_fetch_k: 6,
            mmr_lambda: 0.5,
        },
    );
    let results = retriever.similarity_search(&query, 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "B.pdf:0:0");
    assert_eq!(results[0].text, "Disputes go to arbitration.");
}
