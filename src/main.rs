//! # Legal RAG Server Main Driver
//!
//! ## Purpose
//! Main entry point for the legal RAG server. Orchestrates initialization of
//! all pipeline components and starts the web server for handling question
//! answering requests.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files, command line arguments, environment variables
//! - **Output**: Running web server with query and indexing endpoints
//! - **Administration**: Index synchronization and index wipe via flags
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open the persistent chunk index and service clients
//! 4. Optionally run index administration (sync or wipe)
//! 5. Start web API server
//! 6. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use legal_rag_engine::{
    api::ApiServer,
    config::Config,
    embedding::HttpEmbedder,
    errors::{RagError, Result},
    generation::GeminiChatModel,
    index::store::IndexStore,
    speech::SpeechSynthesizer,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so key overrides are visible to config loading
    dotenvy::dotenv().ok();

    let matches = Command::new("legal-rag-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Legal Search Team")
        .about("Retrieval-augmented generation server for legal document question answering")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("index")
                .long("index")
                .help("Synchronize the chunk index from the PDF corpus and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("clear-index")
                .long("clear-index")
                .help("Destroy the persistent chunk index and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Run health checks and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration
    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);
    init_logging(&config)?;

    info!("Starting Legal RAG Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", config_path);

    // Index wipe happens before any handle is opened on the store path
    if matches.get_flag("clear-index") {
        IndexStore::destroy(&config.index.db_path)?;
        info!("Chunk index cleared");
        return Ok(());
    }

    if matches.get_flag("check-health") {
        return run_health_checks(&config);
    }

    let app_state = initialize_components(config.clone())?;

    if matches.get_flag("index") {
        let report = legal_rag_engine::api::run_indexing(&app_state).await?;
        info!(
            documents = report.documents_loaded,
            inserted = report.chunks_inserted,
            skipped = report.chunks_skipped,
            total = report.total_entries,
            "Index synchronization complete"
        );
        return Ok(());
    }

    let server = ApiServer::new(app_state);

    info!(
        "Legal RAG Engine started on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Legal RAG Engine shut down successfully");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config.logging.level.parse().map_err(|_| RagError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);
    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(fmt_layer.json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt_layer.with_filter(filter))
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Initialize all pipeline components
fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing pipeline components...");

    info!("Opening chunk index...");
    let store = Arc::new(IndexStore::open(&config.index)?);

    let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
    let chat_model = Arc::new(GeminiChatModel::new(&config.generation)?);
    let speech = Arc::new(SpeechSynthesizer::new(&config.speech)?);

    store.health_check()?;
    info!("All components initialized successfully");

    Ok(AppState {
        config,
        store,
        embedder,
        chat_model,
        speech,
    })
}

/// Run startup health checks without serving
fn run_health_checks(config: &Config) -> Result<()> {
    info!("Running health checks...");

    info!("✓ Configuration is valid");

    if !config.corpus.pdf_dir.is_dir() {
        warn!(
            "Corpus directory does not exist: {:?}",
            config.corpus.pdf_dir
        );
    } else {
        info!("✓ Corpus directory exists");
    }

    let store = IndexStore::open(&config.index)?;
    store.health_check()?;
    info!("✓ Chunk index is accessible ({} entries)", store.count());

    if config.generation.api_key.is_none() {
        warn!("Generation API key is not set (GENERATION_API_KEY)");
    }

    info!("All health checks passed!");
    Ok(())
}
