//! # Answer Generation Module
//!
//! ## Purpose
//! Assembles retrieved chunks and the user question into a role-specific
//! prompt, submits it to an external chat model, and returns the generated
//! text verbatim together with the source identifiers used.
//!
//! ## Input/Output Specification
//! - **Input**: Retrieved chunks, user question, answer role
//! - **Output**: `Answer { text, sources }`
//! - **Roles**: Plain-language summary/advisory, technical summary/analysis
//!
//! ## Key Features
//! - One canonical template per role, filled with `{context}` / `{question}`
//! - Context assembled by joining chunk texts with a `---` separator
//! - `ChatModel` trait seam; Gemini-style HTTP client behind it

use crate::config::GenerationConfig;
use crate::errors::{RagError, Result};
use crate::retrieval::RetrievedChunk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Separator between chunk texts in the assembled context
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// The register and depth of the generated answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerRole {
    /// Everyday-language explanation of what the documents say
    PlainSummary,
    /// Everyday-language guidance on what the asker can do
    PlainAdvisory,
    /// Practitioner-register summary with citations to the provided context
    TechnicalSummary,
    /// Practitioner-register issue/rule/application/conclusion analysis
    TechnicalAnalysis,
}

impl AnswerRole {
    /// Prompt template for this role. Placeholders: `{context}`, `{question}`.
    pub fn template(&self) -> &'static str {
        match self {
            AnswerRole::PlainSummary => {
                "You are a legal assistant explaining documents to someone with no legal \
                 background. Using only the context below, summarize what the documents say \
                 about the question in plain, everyday language. Avoid legal jargon; when a \
                 legal term is unavoidable, explain it in one short sentence.\n\n\
                 Context:\n{context}\n\nQuestion: {question}\n\nPlain-language summary:"
            }
            AnswerRole::PlainAdvisory => {
                "You are a legal assistant helping someone with no legal background understand \
                 their options. Using only the context below, explain in plain, everyday \
                 language what the documents suggest the person can do about their question, \
                 including any conditions or deadlines the documents mention.\n\n\
                 Context:\n{context}\n\nQuestion: {question}\n\nPlain-language guidance:"
            }
            AnswerRole::TechnicalSummary => {
                "You are assisting a legal professional. Using only the context below, provide \
                 a precise technical summary of the provisions relevant to the question. Quote \
                 or cite the specific passages you rely on.\n\n\
                 Context:\n{context}\n\nQuestion: {question}\n\nTechnical summary:"
            }
            AnswerRole::TechnicalAnalysis => {
                "You are assisting a legal professional. Using only the context below, analyze \
                 the question in IRAC form: state the issue, the applicable rules from the \
                 context, their application to the question, and a conclusion. Cite the \
                 specific passages you rely on.\n\n\
                 Context:\n{context}\n\nQuestion: {question}\n\nAnalysis:"
            }
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "plain_summary" => Ok(AnswerRole::PlainSummary),
            "plain_advisory" => Ok(AnswerRole::PlainAdvisory),
            "technical_summary" => Ok(AnswerRole::TechnicalSummary),
            "technical_analysis" => Ok(AnswerRole::TechnicalAnalysis),
            other => Err(RagError::InvalidApiRequest {
                details: format!("unknown answer role '{}'", other),
            }),
        }
    }
}

/// A generated answer with the chunk identifiers it drew on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Generated text, returned verbatim from the model
    pub text: String,
    /// Identifiers of the retrieved chunks supplied as context
    pub sources: Vec<String>,
}

/// Chat model seam
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Submit a prompt and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Fill a role template with retrieved context and the question, then submit
/// it to the chat model.
pub async fn generate_answer(
    model: &dyn ChatModel,
    role: AnswerRole,
    question: &str,
    chunks: &[RetrievedChunk],
) -> Result<Answer> {
    let context = chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    let prompt = role
        .template()
        .replace("{context}", &context)
        .replace("{question}", question);

    debug!(?role, chunks = chunks.len(), "Generating answer");
    let text = model.generate(&prompt).await?;

    Ok(Answer {
        text,
        sources: chunks.iter().map(|c| c.id.clone()).collect(),
    })
}

/// HTTP client for Gemini-style `generateContent` endpoints
pub struct GeminiChatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiChatModel {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(RagError::Config {
                message: "generation API key is not set (GENERATION_API_KEY)".to_string(),
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RagError::Generation {
                details: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ModelParams,
}

#[derive(Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct ModelParams {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[async_trait]
impl ChatModel for GeminiChatModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let payload = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: ModelParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self.client.post(&url).json(&payload).send().await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RagError::Generation {
                details: format!("failed to read response: {}", e),
            })?;
        if !status.is_success() {
            return Err(RagError::Generation {
                details: format!("generation request failed ({}): {}", status, body),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| RagError::Generation {
                details: format!("invalid generation response: {}", e),
            })?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .filter(|t| !t.is_empty())
            .ok_or(RagError::EmptyGeneration)
    }
}
