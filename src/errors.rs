//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the legal RAG service, providing one error
//! type and one `Result` contract for every operation in the pipeline.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from corpus loading, indexing, retrieval,
//!   generation, speech synthesis and the API layer
//! - **Output**: Structured error values with context, suitable for logging
//!   and for structured HTTP error responses
//! - **Error Categories**: Input, Storage, Embedding, Generation, Speech,
//!   Configuration, API
//!
//! ## Key Features
//! - Single result-or-error contract per operation
//! - Automatic conversion from library error types
//! - Category tags for metrics and logging
//! - Recoverability hints for callers that wrap external calls in retries

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, RagError>;

/// Error types for the legal RAG service
#[derive(Debug, Error)]
pub enum RagError {
    // Input / corpus errors
    #[error("Source file not found: {path}")]
    SourceNotFound { path: String },

    #[error("Unsupported file type '{extension}' for {path}")]
    UnsupportedFileType { path: String, extension: String },

    #[error("No extractable text in {path}: {details}")]
    NoExtractableText { path: String, details: String },

    #[error("PDF extraction failed for {path}: {details}")]
    ExtractionFailed { path: String, details: String },

    // Persistent index errors
    #[error("Index store error: {details}")]
    Storage { details: String },

    #[error("Index connection failed: {db_path} - {reason}")]
    StoreConnectionFailed { db_path: String, reason: String },

    #[error("Serialization failed: {message}")]
    SerializationFailed { message: String },

    // Embedding errors
    #[error("Embedding request failed: {details}")]
    Embedding { details: String },

    #[error("Embedding dimension mismatch: query has {query_dim}, stored entry '{entry_id}' has {entry_dim}")]
    EmbeddingDimensionMismatch {
        entry_id: String,
        query_dim: usize,
        entry_dim: usize,
    },

    // Generation errors
    #[error("Generation request failed: {details}")]
    Generation { details: String },

    #[error("Empty response from generation service")]
    EmptyGeneration,

    // Translation / speech errors
    #[error("Unsupported language code: {code}")]
    UnsupportedLanguage { code: String },

    #[error("Speech synthesis failed: {details}")]
    Speech { details: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    // API errors
    #[error("Invalid API request: {details}")]
    InvalidApiRequest { details: String },

    // Infrastructure
    #[error("Network error: {details}")]
    Network { details: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RagError {
    /// Check if the error is recoverable (can be retried by a wrapper)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RagError::Network { .. }
                | RagError::Embedding { .. }
                | RagError::Generation { .. }
                | RagError::Speech { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            RagError::SourceNotFound { .. }
            | RagError::UnsupportedFileType { .. }
            | RagError::NoExtractableText { .. }
            | RagError::ExtractionFailed { .. } => "input",
            RagError::Storage { .. }
            | RagError::StoreConnectionFailed { .. }
            | RagError::SerializationFailed { .. } => "storage",
            RagError::Embedding { .. } | RagError::EmbeddingDimensionMismatch { .. } => {
                "embedding"
            }
            RagError::Generation { .. } | RagError::EmptyGeneration => "generation",
            RagError::UnsupportedLanguage { .. } | RagError::Speech { .. } => "speech",
            RagError::Config { .. } | RagError::ValidationFailed { .. } => "configuration",
            RagError::InvalidApiRequest { .. } => "api",
            RagError::Network { .. } | RagError::Internal { .. } => "generic",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::SerializationFailed {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Network {
            details: err.to_string(),
        }
    }
}

impl From<bincode::Error> for RagError {
    fn from(err: bincode::Error) -> Self {
        RagError::SerializationFailed {
            message: format!("Binary serialization error: {}", err),
        }
    }
}

impl From<sled::Error> for RagError {
    fn from(err: sled::Error) -> Self {
        RagError::Storage {
            details: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RagError {
    fn from(err: toml::de::Error) -> Self {
        RagError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
