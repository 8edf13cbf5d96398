//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the legal RAG service, supporting TOML files
//! and environment variable overrides with validation and type-safe access to
//! all pipeline settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Range checks, dependency checks, per-field failure messages
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values
//!
//! ## Usage
//! ```rust,no_run
//! use legal_rag_engine::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Server port: {}", config.server.port);
//! ```

use crate::errors::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Corpus loading and chunking settings
    pub corpus: CorpusConfig,
    /// Embedding service configuration
    pub embedding: EmbeddingConfig,
    /// Persistent index storage settings
    pub index: IndexConfig,
    /// Retrieval behavior
    pub retrieval: RetrievalConfig,
    /// Answer generation service
    pub generation: GenerationConfig,
    /// Translation and speech synthesis
    pub speech: SpeechConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

/// Corpus loading and chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory of PDF source documents, consumed as a batch at indexing time
    pub pdf_dir: PathBuf,
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks from the same page, in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size in characters; shorter trailing fragments are kept
    /// only when a page produces nothing else
    pub min_chunk_size: usize,
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding endpoint (OpenAI-compatible)
    pub base_url: String,
    /// API key (usually supplied via EMBEDDING_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Maximum inputs per request
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Persistent index storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index storage directory; deleting it is the only supported clear
    pub db_path: PathBuf,
    /// Enable gzip compression of stored chunk text
    pub enable_compression: bool,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default number of results when the caller does not supply `k`
    pub default_k: usize,
    /// Default candidate pool size for diversity search
    pub default_fetch_k: usize,
    /// Relevance/diversity trade-off for max-marginal-relevance (0.0..=1.0;
    /// higher favors relevance)
    pub mmr_lambda: f32,
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the chat completion endpoint
    pub base_url: String,
    /// API key (usually supplied via GENERATION_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Translation and speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Base URL of the speech synthesis endpoint
    pub tts_url: String,
    /// API key (usually supplied via SPEECH_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Speech rate adjustment, e.g. "+10%"
    pub rate: String,
    /// Directory for produced audio artifacts; created on demand
    pub output_dir: PathBuf,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| RagError::Config {
                message: format!("Failed to read config file {:?}: {}", path, e),
            })?;
            toml::from_str(&content).map_err(|e| RagError::Config {
                message: format!("Failed to parse config file {:?}: {}", path, e),
            })?
        } else {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("LEGAL_RAG_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LEGAL_RAG_PORT") {
            self.server.port = port.parse().map_err(|_| RagError::Config {
                message: "Invalid port number in LEGAL_RAG_PORT".to_string(),
            })?;
        }
        if let Ok(pdf_dir) = std::env::var("LEGAL_RAG_PDF_DIR") {
            self.corpus.pdf_dir = PathBuf::from(pdf_dir);
        }
        if let Ok(db_path) = std::env::var("LEGAL_RAG_DB_PATH") {
            self.index.db_path = PathBuf::from(db_path);
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("GENERATION_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("SPEECH_API_KEY") {
            self.speech.api_key = Some(key);
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(RagError::ValidationFailed {
                field: "server.port".to_string(),
                reason: "Port cannot be zero".to_string(),
            });
        }

        if self.corpus.chunk_size == 0 {
            return Err(RagError::ValidationFailed {
                field: "corpus.chunk_size".to_string(),
                reason: "Chunk size must be greater than zero".to_string(),
            });
        }

        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return Err(RagError::ValidationFailed {
                field: "corpus.chunk_overlap".to_string(),
                reason: "Chunk overlap must be smaller than chunk size".to_string(),
            });
        }

        if self.retrieval.default_k == 0 {
            return Err(RagError::ValidationFailed {
                field: "retrieval.default_k".to_string(),
                reason: "Default result count must be greater than zero".to_string(),
            });
        }

        if self.retrieval.default_fetch_k < self.retrieval.default_k {
            return Err(RagError::ValidationFailed {
                field: "retrieval.default_fetch_k".to_string(),
                reason: "Candidate pool cannot be smaller than the result count".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.retrieval.mmr_lambda) {
            return Err(RagError::ValidationFailed {
                field: "retrieval.mmr_lambda".to_string(),
                reason: "MMR lambda must be within 0.0..=1.0".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RagError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
            },
            corpus: CorpusConfig {
                pdf_dir: PathBuf::from("./PDFS"),
                chunk_size: 800,
                chunk_overlap: 80,
                min_chunk_size: 100,
            },
            embedding: EmbeddingConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                api_key: None,
                model: "text-embedding-3-small".to_string(),
                batch_size: 64,
                timeout_seconds: 30,
            },
            index: IndexConfig {
                db_path: PathBuf::from("./data/chunk_index"),
                enable_compression: true,
            },
            retrieval: RetrievalConfig {
                default_k: 7,
                default_fetch_k: 25,
                mmr_lambda: 0.5,
            },
            generation: GenerationConfig {
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: None,
                model: "gemini-2.5-flash".to_string(),
                temperature: 0.7,
                max_output_tokens: 4096,
                timeout_seconds: 60,
            },
            speech: SpeechConfig {
                tts_url: "https://tts.example.com/v1/synthesize".to_string(),
                api_key: None,
                rate: "+10%".to_string(),
                output_dir: PathBuf::from("./static"),
                timeout_seconds: 60,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}
