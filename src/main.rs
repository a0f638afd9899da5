use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use vialert_api::RestApi;
use vialert_similarity::openai::{DEFAULT_BASE_URL, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL};
use vialert_similarity::{
    EngineConfig, OpenAiChatClient, OpenAiConfig, OpenAiEmbeddingClient, SimilarityEngine,
};
use vialert_storage::{
    AccidentRepository, DatasetLoader, InMemoryAccidentRepository, LmdbAccidentRepository,
};

/// Accident similarity search and road safety alerts
#[derive(Parser, Debug)]
#[command(name = "vialert")]
#[command(about = "Accident similarity search and road safety alerts", long_about = None)]
struct Args {
    /// Path to the accident dataset (comma-delimited, header line first)
    #[arg(long, env = "VIALERT_DATASET", default_value = "./data/dataset.csv")]
    dataset: PathBuf,

    /// Directory for the reported-accident database; in memory when omitted
    #[arg(long, env = "VIALERT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "VIALERT_HTTP_PORT", default_value_t = 8080)]
    http_port: u16,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    openai_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "VIALERT_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    #[arg(long, env = "VIALERT_CHAT_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Deadline for each call to the embedding or chat service
    #[arg(long, env = "VIALERT_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting vialert v{}", env!("CARGO_PKG_VERSION"));
    info!("Dataset: {:?}", args.dataset);
    info!("HTTP API port: {}", args.http_port);

    let timeout = Duration::from_secs(args.request_timeout_secs);
    let openai = OpenAiConfig {
        base_url: args.openai_base_url.clone(),
        api_key: args.openai_api_key.clone(),
        embedding_model: args.embedding_model.clone(),
        timeout,
    };

    let repository: Arc<dyn AccidentRepository> = match &args.data_dir {
        Some(dir) => {
            info!("Accident repository: {:?}", dir);
            Arc::new(LmdbAccidentRepository::open(dir.join("lmdb"))?)
        }
        None => {
            info!("Accident repository: in memory");
            Arc::new(InMemoryAccidentRepository::new())
        }
    };

    let engine = Arc::new(SimilarityEngine::new(
        Arc::new(OpenAiEmbeddingClient::new(openai.clone())?),
        Arc::new(OpenAiChatClient::new(openai)?),
        repository,
        EngineConfig {
            call_timeout: timeout,
            chat_model: args.chat_model.clone(),
            ..Default::default()
        },
    ));

    let indexed = engine.load_dataset(&DatasetLoader::new(&args.dataset)).await?;
    info!("Similarity index ready: {} records", indexed);

    let engine_http = engine.clone();
    let http_port = args.http_port;
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", http_port);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(engine_http, http_port).await {
                tracing::error!("HTTP server error: {}", e);
            }
        })
    });

    info!("vialert started successfully");
    info!("HTTP API: http://localhost:{}/", args.http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
