//! # Embedding Module
//!
//! ## Purpose
//! Turns chunk and query text into dense vectors via an external
//! OpenAI-compatible embedding service.
//!
//! ## Input/Output Specification
//! - **Input**: Batches of text
//! - **Output**: One `Vec<f32>` per input, in input order
//! - **Errors**: Service failures propagate as `RagError::Embedding`; callers
//!   decide whether to retry (indexing does not)
//!
//! ## Key Features
//! - `Embedder` trait seam so indexing and retrieval are testable offline
//! - Batch contract enforced against the configured maximum
//! - Deterministic in-process embedder for tests

use crate::config::EmbeddingConfig;
use crate::errors::{RagError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Embedding provider seam
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query string.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(RagError::Embedding {
            details: "service returned no embedding for query".to_string(),
        })
    }

    /// Maximum inputs per `embed_batch` call.
    fn batch_size(&self) -> usize;
}

/// HTTP client for OpenAI-compatible embedding endpoints
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    batch_size: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RagError::Embedding {
                details: format!("failed to build HTTP client: {}", e),
            })?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            batch_size: config.batch_size,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if inputs.len() > self.batch_size {
            return Err(RagError::Embedding {
                details: format!(
                    "batch of {} exceeds configured max {}",
                    inputs.len(),
                    self.batch_size
                ),
            });
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::Embedding {
                details: format!("embedding request failed ({}): {}", status, body),
            });
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.map_err(|e| RagError::Embedding {
                details: format!("failed to parse embedding response: {}", e),
            })?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(RagError::Embedding {
                details: format!(
                    "service returned {} embeddings for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                ),
            });
        }

        debug!(count = inputs.len(), "Embedded batch");
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Deterministic embedder for tests: hashes character n-grams into a small
/// fixed-dimension vector so similar texts land near each other and equal
/// texts embed identically.
pub struct DeterministicEmbedder {
    pub dimension: usize,
}

impl DeterministicEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        for window in chars.windows(3) {
            let mut hash: u64 = 1469598103934665603;
            for c in window {
                hash ^= *c as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|t| self.embed_one(t)).collect())
    }

    fn batch_size(&self) -> usize {
        256
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: base_url.to_string(),
            api_key: Some("test-key".to_string()),
            model: "text-embedding-3-small".to_string(),
            batch_size: 4,
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn embeds_batch_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-small"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri())).unwrap();
        let vectors = embedder
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn rejects_oversized_batches_locally() {
        let embedder = HttpEmbedder::new(&test_config("http://localhost:1")).unwrap();
        let inputs: Vec<String> = (0..5).map(|i| format!("chunk {i}")).collect();
        let err = embedder.embed_batch(&inputs).await.unwrap_err();
        assert_eq!(err.category(), "embedding");
    }

    #[tokio::test]
    async fn service_errors_carry_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&test_config(&server.uri())).unwrap();
        let err = embedder
            .embed_batch(&["chunk".to_string()])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limited"));
    }

    #[tokio::test]
    async fn deterministic_embedder_is_stable_and_normalized() {
        let embedder = DeterministicEmbedder::new(16);
        let a = embedder.embed_query("the tenant may terminate").await.unwrap();
        let b = embedder.embed_query("the tenant may terminate").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
