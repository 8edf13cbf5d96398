//! Offline demonstration of the indexing and retrieval pipeline.
//!
//! Runs the chunk identity assignment, incremental index synchronization and
//! similarity search against a temporary on-disk store, using the
//! deterministic in-process embedder so no external services are needed.

use legal_rag_engine::config::{IndexConfig, RetrievalConfig};
use legal_rag_engine::embedding::{DeterministicEmbedder, Embedder};
use legal_rag_engine::index::store::IndexStore;
use legal_rag_engine::index::{assign_chunk_ids, IncrementalIndexer};
use legal_rag_engine::retrieval::Retriever;
use legal_rag_engine::Chunk;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let dir = tempfile::tempdir()?;
    let store = IndexStore::open(&IndexConfig {
        db_path: dir.path().join("index"),
        enable_compression: true,
    })?;
    let embedder = DeterministicEmbedder::new(64);

    let chunks = vec![
        Chunk {
            source: "lease.pdf".to_string(),
            page: 0,
            text: "The lessor shall maintain the premises in habitable condition.".to_string(),
        },
        Chunk {
            source: "lease.pdf".to_string(),
            page: 0,
            text: "The lessee shall pay rent on the first of each month.".to_string(),
        },
        Chunk {
            source: "lease.pdf".to_string(),
            page: 1,
            text: "Either party may terminate with thirty days written notice.".to_string(),
        },
    ];

    let identified = assign_chunk_ids(chunks);
    for c in &identified {
        info!("assigned {}", c.id);
    }

    let indexer = IncrementalIndexer::new(&store, &embedder);
    let report = indexer.sync(identified.clone()).await?;
    info!("first pass inserted {} chunks", report.inserted);

    let report = indexer.sync(identified).await?;
    info!("second pass inserted {} chunks (idempotent)", report.inserted);

    let query = embedder.embed_query("how do I end the lease?").await?;
    let retriever = Retriever::new(
        &store,
        RetrievalConfig {
            default_k: 2,
            default_fetch_k: 3,
            mmr_lambda: 0.5,
        },
    );
    for result in retriever.similarity_search(&query, 2)? {
        info!("[{:.3}] {} — {}", result.score, result.id, result.text);
    }

    Ok(())
}
