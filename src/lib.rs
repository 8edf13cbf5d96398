//! # Legal RAG Engine
//!
//! ## Overview
//! This library implements a retrieval-augmented generation service for legal
//! question answering: PDF legal documents are chunked, embedded and stored in
//! a persistent index; user queries retrieve relevant chunks which are fed to
//! a hosted language model, with optional translation and speech synthesis of
//! the answer.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `corpus`: PDF loading, text extraction and chunk splitting
//! - `index`: Chunk identity assignment and incremental indexing
//! - `embedding`: Embedding service clients
//! - `retrieval`: Similarity and diversity-aware search over the index
//! - `generation`: Role-based prompt assembly and answer generation
//! - `speech`: Translation and speech synthesis of generated answers
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: PDF legal documents, natural-language questions
//! - **Output**: Generated answers with source citations, optional audio
//! - **Guarantee**: Deterministic chunk identifiers; idempotent re-indexing
//!
//! ## Usage
//! ```rust,no_run
//! use legal_rag_engine::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Corpus directory: {:?}", config.corpus.pdf_dir);
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod corpus;
pub mod index;
pub mod embedding;
pub mod retrieval;
pub mod generation;
pub mod speech;
pub mod api;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{RagError, Result};

// Core types used throughout the system
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A source document with its extracted page texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Source label, the file name of the originating PDF
    pub source: String,
    /// Per-page extracted text, in page order
    pub pages: Vec<Page>,
}

/// One page of a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page index within the document
    pub index: usize,
    /// Extracted and cleaned page text
    pub text: String,
}

/// A text chunk produced by splitting a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source label of the originating document
    pub source: String,
    /// Zero-based page index the chunk was cut from
    pub page: usize,
    /// Chunk text
    pub text: String,
}

/// A chunk with its assigned stable identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedChunk {
    /// Identifier in the form `{source}:{page}:{ordinal}`
    pub id: String,
    /// The underlying chunk
    pub chunk: Chunk,
}

/// Application state shared across API handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub store: Arc<index::store::IndexStore>,
    pub embedder: Arc<dyn embedding::Embedder>,
    pub chat_model: Arc<dyn generation::ChatModel>,
    pub speech: Arc<speech::SpeechSynthesizer>,
}
