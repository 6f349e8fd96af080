use clap::Parser;
use picsearch_core::config;
use picsearch_server::api::create_router;
use picsearch_server::api::handlers::AppState;
use picsearch_server::assets::AssetStore;
use picsearch_server::embedding::HttpEmbedder;
use picsearch_server::store::MilvusConnector;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "picsearch", about = "Multimodal image search service over Milvus")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Root directory for uploaded images, one subdirectory per collection
    #[arg(short, long, default_value = config::DEFAULT_UPLOAD_DIR)]
    upload_dir: String,

    /// Build directory of the browser client, served for every non-API path
    #[arg(long, default_value = config::DEFAULT_STATIC_DIR)]
    static_dir: String,

    /// Timeout in seconds for one embedding service call
    #[arg(long, default_value_t = config::DEFAULT_EMBED_TIMEOUT_SECS)]
    embed_timeout_secs: u64,

    /// Timeout in seconds for one vector store call
    #[arg(long, default_value_t = config::DEFAULT_STORE_TIMEOUT_SECS)]
    store_timeout_secs: u64,

    /// Maximum embedding calls in flight during one import
    #[arg(long, default_value_t = config::DEFAULT_INGEST_CONCURRENCY)]
    ingest_concurrency: usize,

    /// TLS certificate file path
    #[arg(long)]
    tls_cert: Option<String>,

    /// TLS private key file path
    #[arg(long)]
    tls_key: Option<String>,

    /// Graceful shutdown timeout in seconds
    #[arg(long, default_value_t = config::DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    shutdown_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("picsearch_server=info".parse()?)
                .add_directive("picsearch_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }
    if args.ingest_concurrency == 0 {
        eprintln!("Error: ingest_concurrency must be > 0");
        std::process::exit(1);
    }
    let upload_path = std::path::Path::new(&args.upload_dir);
    if upload_path.exists() && !upload_path.is_dir() {
        eprintln!(
            "Error: upload_dir '{}' exists but is not a directory",
            args.upload_dir
        );
        std::process::exit(1);
    }
    std::fs::create_dir_all(upload_path)?;
    if !std::path::Path::new(&args.static_dir).join("index.html").is_file() {
        tracing::warn!(
            static_dir = %args.static_dir,
            "No index.html in static_dir, the browser client will not be served"
        );
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let connector = MilvusConnector::new(
        Duration::from_secs(config::STORE_CONNECT_TIMEOUT_SECS),
        Duration::from_secs(args.store_timeout_secs),
    );
    let embedder = HttpEmbedder::new(Duration::from_secs(args.embed_timeout_secs))?;

    let state = AppState {
        connector: Arc::new(connector),
        embedder: Arc::new(embedder),
        assets: AssetStore::new(&args.upload_dir),
        static_dir: args.static_dir.clone().into(),
        ingest_concurrency: args.ingest_concurrency,
        prometheus_handle,
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        upload_dir = %args.upload_dir,
        static_dir = %args.static_dir,
        embed_timeout_secs = args.embed_timeout_secs,
        store_timeout_secs = args.store_timeout_secs,
        ingest_concurrency = args.ingest_concurrency,
        tls = args.tls_cert.is_some(),
        "picsearch ready"
    );

    let shutdown_timeout = args.shutdown_timeout;
    match (args.tls_cert, args.tls_key) {
        (Some(cert), Some(key)) => {
            tracing::info!("TLS enabled");
            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert, &key).await?;
            let handle = axum_server::Handle::new();
            let shutdown_handle = handle.clone();
            tokio::spawn(async move {
                wait_for_signal().await;
                shutdown_handle.graceful_shutdown(Some(Duration::from_secs(shutdown_timeout)));
            });
            axum_server::bind_rustls(addr.parse()?, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        (None, None) => {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_signal())
                .await?;
        }
        _ => {
            eprintln!("Error: Both --tls-cert and --tls-key must be provided together");
            std::process::exit(1);
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    tracing::info!("Shutting down gracefully, draining in-flight requests...");
}
