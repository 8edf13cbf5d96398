//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing the question-answering pipeline and the
//! administrative indexing operations of the legal RAG service.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with questions, answer roles, retrieval
//!   parameters and optional language codes
//! - **Output**: JSON responses with generated answers, source citations,
//!   audio artifact paths, index reports, health and statistics
//! - **Endpoints**: Query, index, health, stats, service info
//!
//! ## Key Features
//! - Thin handlers: validation at the boundary, pipeline logic in the library
//! - CORS support for web frontends
//! - Structured error responses carrying the error category

use crate::corpus::{splitter::ChunkSplitter, CorpusLoader};
use crate::errors::{RagError, Result};
use crate::generation::{generate_answer, AnswerRole};
use crate::index::{assign_chunk_ids, IncrementalIndexer};
use crate::retrieval::Retriever;
use crate::speech::{translate, Language};
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// REST API server for the RAG pipeline
pub struct ApiServer {
    app_state: crate::AppState,
}

/// Query request payload
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// The user's question
    pub question: String,
    /// Answer role code; defaults to a plain-language summary
    pub role: Option<String>,
    /// Number of chunks to retrieve
    pub k: Option<usize>,
    /// Candidate pool size for diversity search
    pub fetch_k: Option<usize>,
    /// Use diversity-aware retrieval instead of plain similarity
    pub diverse: Option<bool>,
    /// Target language code; omitting it skips translation and speech
    pub language: Option<String>,
}

/// Query response payload
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub language: String,
    pub audio_path: Option<String>,
    pub query_time_ms: u64,
}

/// Index trigger response payload
#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub documents_loaded: usize,
    pub files_skipped: usize,
    pub chunks_presented: usize,
    pub chunks_inserted: usize,
    pub chunks_skipped: usize,
    pub total_entries: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub index_store: String,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: crate::AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server
    pub async fn run(self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;

        info!("Starting API server on {}", bind_addr);

        HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };
            App::new()
                .wrap(cors)
                .app_data(web::Data::new(self.app_state.clone()))
                .route("/", web::get().to(info_handler))
                .route("/query", web::post().to(query_handler))
                .route("/index", web::post().to(index_handler))
                .route("/health", web::get().to(health_handler))
                .route("/stats", web::get().to(stats_handler))
        })
        .bind(&bind_addr)
        .map_err(|e| RagError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run()
        .await
        .map_err(|e| RagError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

fn error_response(err: &RagError) -> HttpResponse {
    let body = serde_json::json!({
        "error": err.category(),
        "message": err.to_string(),
    });
    match err {
        RagError::InvalidApiRequest { .. } | RagError::UnsupportedLanguage { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Query endpoint handler: retrieve, generate, optionally translate and speak
async fn query_handler(
    app_state: web::Data<crate::AppState>,
    request: web::Json<QueryRequest>,
) -> ActixResult<HttpResponse> {
    let start_time = std::time::Instant::now();

    match run_query(&app_state, &request).await {
        Ok(mut response) => {
            response.query_time_ms = start_time.elapsed().as_millis() as u64;
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("Query failed: {}", e);
            Ok(error_response(&e))
        }
    }
}

async fn run_query(
    app_state: &crate::AppState,
    request: &QueryRequest,
) -> Result<QueryResponse> {
    if request.question.trim().is_empty() {
        return Err(RagError::InvalidApiRequest {
            details: "question must not be empty".to_string(),
        });
    }

    let role = match &request.role {
        Some(code) => AnswerRole::from_code(code)?,
        None => AnswerRole::PlainSummary,
    };
    let language = match &request.language {
        Some(code) => Some(Language::from_code(code)?),
        None => None,
    };

    let retrieval = &app_state.config.retrieval;
    let k = request.k.unwrap_or(retrieval.default_k);
    let query_embedding = app_state.embedder.embed_query(&request.question).await?;

    let retriever = Retriever::new(&app_state.store, retrieval.clone());
    let chunks = if request.diverse.unwrap_or(true) {
        retriever.mmr_search(&query_embedding, k, request.fetch_k)?
    } else {
        retriever.similarity_search(&query_embedding, k)?
    };

    let answer = generate_answer(
        app_state.chat_model.as_ref(),
        role,
        &request.question,
        &chunks,
    )
    .await?;

    let (text, language_code, audio_path) = match language {
        Some(lang) => {
            let translated = translate(app_state.chat_model.as_ref(), &answer.text, lang).await?;
            let path = app_state.speech.synthesize(&translated, lang).await?;
            (translated, lang.code(), Some(path.display().to_string()))
        }
        None => (answer.text, Language::English.code(), None),
    };

    Ok(QueryResponse {
        answer: text,
        sources: answer.sources,
        language: language_code.to_string(),
        audio_path,
        query_time_ms: 0,
    })
}

/// Index trigger handler: load the corpus and synchronize the index
async fn index_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    match run_indexing(&app_state).await {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(e) => {
            error!("Indexing failed: {}", e);
            Ok(error_response(&e))
        }
    }
}

/// Load the corpus, split and identify chunks, and synchronize the index.
/// Shared by the HTTP trigger and the `--index` CLI flag.
pub async fn run_indexing(app_state: &crate::AppState) -> Result<IndexResponse> {
    let loader = CorpusLoader::new(&app_state.config.corpus.pdf_dir);
    let report = loader.load_all()?;

    let splitter = ChunkSplitter::new(&app_state.config.corpus);
    let mut chunks = Vec::new();
    for document in &report.documents {
        chunks.extend(splitter.split_document(document));
    }
    let identified = assign_chunk_ids(chunks);

    let indexer = IncrementalIndexer::new(&app_state.store, app_state.embedder.as_ref());
    let index_report = indexer.sync(identified).await?;

    Ok(IndexResponse {
        documents_loaded: report.loaded_count(),
        files_skipped: report.skipped_count(),
        chunks_presented: index_report.presented,
        chunks_inserted: index_report.inserted,
        chunks_skipped: index_report.skipped,
        total_entries: app_state.store.count(),
    })
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let store_status = match app_state.store.health_check() {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let response = HealthResponse {
        status: store_status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            index_store: store_status.to_string(),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Statistics endpoint handler
async fn stats_handler(app_state: web::Data<crate::AppState>) -> ActixResult<HttpResponse> {
    let size_on_disk = app_state.store.size_on_disk().unwrap_or(0);
    let response = serde_json::json!({
        "index": {
            "entries": app_state.store.count(),
            "size_on_disk_bytes": size_on_disk,
        },
        "supported_languages": Language::ALL.iter().map(|l| l.code()).collect::<Vec<_>>(),
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });

    Ok(HttpResponse::Ok().json(response))
}

/// Service info handler
async fn info_handler() -> ActixResult<HttpResponse> {
    let response = serde_json::json!({
        "service": "legal-rag-engine",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /query": "Ask a question against the indexed corpus",
            "POST /index": "Load the PDF corpus and synchronize the index",
            "GET /health": "Component health status",
            "GET /stats": "Index statistics",
        },
    });

    Ok(HttpResponse::Ok().json(response))
}
