//! # Translation and Speech Module
//!
//! ## Purpose
//! Post-processes a generated answer: translates it to a supported target
//! language via the chat model when needed, then synthesizes speech via an
//! external text-to-speech service into a unique audio artifact per request.
//!
//! ## Input/Output Specification
//! - **Input**: Answer text, language code
//! - **Output**: Translated text and the path of a freshly written `.mp3`
//! - **Errors**: Unsupported language codes fail explicitly at the boundary;
//!   service failures propagate as `RagError::Speech`
//!
//! ## Key Features
//! - Closed language table: code, voice model and translation target name
//! - Unique `{uuid}.mp3` artifact under the configured output directory
//! - Output directory created on demand

use crate::config::SpeechConfig;
use crate::errors::{RagError, Result};
use crate::generation::ChatModel;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Supported answer languages. The table is closed: any other code is
/// rejected at the boundary rather than passed through to the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Kannada,
    Tamil,
    Malayalam,
    Telugu,
}

impl Language {
    pub const ALL: &'static [Language] = &[
        Language::English,
        Language::Hindi,
        Language::Kannada,
        Language::Tamil,
        Language::Malayalam,
        Language::Telugu,
    ];

    /// Parse a three-letter language code; unknown codes are an error.
    pub fn from_code(code: &str) -> Result<Self> {
        match code.to_ascii_lowercase().as_str() {
            "eng" => Ok(Language::English),
            "hin" => Ok(Language::Hindi),
            "kan" => Ok(Language::Kannada),
            "tam" => Ok(Language::Tamil),
            "mal" => Ok(Language::Malayalam),
            "tel" => Ok(Language::Telugu),
            other => Err(RagError::UnsupportedLanguage {
                code: other.to_string(),
            }),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "eng",
            Language::Hindi => "hin",
            Language::Kannada => "kan",
            Language::Tamil => "tam",
            Language::Malayalam => "mal",
            Language::Telugu => "tel",
        }
    }

    /// Voice model used for speech synthesis.
    pub fn voice(&self) -> &'static str {
        match self {
            Language::English => "en-US-AriaNeural",
            Language::Hindi => "hi-IN-MadhurNeural",
            Language::Kannada => "kn-IN-SapnaNeural",
            Language::Tamil => "ta-IN-PallaviNeural",
            Language::Malayalam => "ml-IN-MidhunNeural",
            Language::Telugu => "te-IN-MohanNeural",
        }
    }

    /// Human-readable name used as the translation target.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Kannada => "Kannada",
            Language::Tamil => "Tamil",
            Language::Malayalam => "Malayalam",
            Language::Telugu => "Telugu",
        }
    }

    /// Whether an English answer needs translation for this language.
    pub fn needs_translation(&self) -> bool {
        !matches!(self, Language::English)
    }
}

/// Translate answer text into the target language using the chat model.
/// English is the identity case and performs no model call.
pub async fn translate(
    model: &dyn ChatModel,
    text: &str,
    language: Language,
) -> Result<String> {
    if !language.needs_translation() {
        return Ok(text.to_string());
    }
    let prompt = format!(
        "Translate the following text to {}. Return only the translated text, \
         with no preamble or commentary.\n\n{}",
        language.display_name(),
        text
    );
    debug!(language = language.code(), "Translating answer");
    model.generate(&prompt).await.map_err(|e| RagError::Speech {
        details: format!("translation failed: {}", e),
    })
}

/// Client for the external text-to-speech service
pub struct SpeechSynthesizer {
    client: reqwest::Client,
    tts_url: String,
    api_key: Option<String>,
    rate: String,
    output_dir: PathBuf,
}

impl SpeechSynthesizer {
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RagError::Speech {
                details: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            tts_url: config.tts_url.clone(),
            api_key: config.api_key.clone(),
            rate: config.rate.clone(),
            output_dir: config.output_dir.clone(),
        })
    }

    /// Override the service endpoint (primarily for tests).
    pub fn with_url<S: Into<String>>(mut self, tts_url: S) -> Self {
        self.tts_url = tts_url.into();
        self
    }

    /// Synthesize `text` with the voice for `language` and write the audio to
    /// a unique file under the output directory. Returns the artifact path.
    pub async fn synthesize(&self, text: &str, language: Language) -> Result<PathBuf> {
        let mut params = HashMap::new();
        params.insert("text", text.to_string());
        params.insert("voice", language.voice().to_string());
        params.insert("rate", self.rate.clone());
        params.insert("format", "mp3".to_string());

        let mut builder = self.client.post(&self.tts_url).form(&params);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| RagError::Speech {
            details: format!("synthesis request failed: {}", e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Speech {
                details: format!("synthesis failed ({}): {}", status, body),
            });
        }

        let bytes = response.bytes().await.map_err(|e| RagError::Speech {
            details: format!("failed to read audio: {}", e),
        })?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join(format!("{}.mp3", Uuid::new_v4()));
        let mut file = tokio::fs::File::create(&output_path).await?;
        file.write_all(&bytes).await?;

        info!(
            language = language.code(),
            path = %output_path.display(),
            "Wrote audio artifact"
        );
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedModel(&'static str);

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn test_config(dir: &std::path::Path) -> SpeechConfig {
        SpeechConfig {
            tts_url: "http://localhost:1/synthesize".to_string(),
            api_key: None,
            rate: "+10%".to_string(),
            output_dir: dir.to_path_buf(),
            timeout_seconds: 5,
        }
    }

    #[test]
    fn unknown_codes_fail_explicitly() {
        let err = Language::from_code("fra").unwrap_err();
        assert!(matches!(err, RagError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn every_language_round_trips_its_code() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()).unwrap(), *lang);
            assert!(!lang.voice().is_empty());
        }
    }

    #[tokio::test]
    async fn english_skips_translation() {
        struct PanicModel;
        #[async_trait]
        impl ChatModel for PanicModel {
            async fn generate(&self, _prompt: &str) -> Result<String> {
                Err(RagError::Internal {
                    message: "should not be called".to_string(),
                })
            }
        }
        let text = translate(&PanicModel, "the answer", Language::English)
            .await
            .unwrap();
        assert_eq!(text, "the answer");
    }

    #[tokio::test]
    async fn translation_uses_the_chat_model() {
        let text = translate(&FixedModel("अनुवादित"), "the answer", Language::Hindi)
            .await
            .unwrap();
        assert_eq!(text, "अनुवादित");
    }

    #[tokio::test]
    async fn synthesize_writes_unique_artifacts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("voice=kn-IN-SapnaNeural"))
            .and(body_string_contains("rate=%2B10%25"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp3-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let synth = SpeechSynthesizer::new(&test_config(dir.path()))
            .unwrap()
            .with_url(server.uri());

        let first = synth.synthesize("answer", Language::Kannada).await.unwrap();
        let second = synth.synthesize("answer", Language::Kannada).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"mp3-bytes");
        assert_eq!(first.extension().unwrap(), "mp3");
    }

    #[tokio::test]
    async fn service_failure_is_a_speech_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let synth = SpeechSynthesizer::new(&test_config(dir.path()))
            .unwrap()
            .with_url(server.uri());

        let err = synth.synthesize("answer", Language::Tamil).await.unwrap_err();
        assert_eq!(err.category(), "speech");
        assert!(err.to_string().contains("boom"));
    }
}
