use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use cinesearch_core::config;
use cinesearch_core::engine::SearchEngine;
use cinesearch_core::error::SearchError;
use cinesearch_server::api::create_router;
use cinesearch_server::api::handlers::AppState;
use cinesearch_server::embedder::HttpEmbedder;
use cinesearch_server::index::ElasticIndex;

#[derive(Parser)]
#[command(name = "cinesearch", about = "Hybrid movie search server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Base URL of the search index
    #[arg(long, default_value = "http://localhost:9200")]
    index_url: String,

    /// Index name holding the movie documents
    #[arg(long, default_value = "movies")]
    index_name: String,

    /// Base URL of the embedding service
    #[arg(long, default_value = "http://localhost:8080")]
    embedder_url: String,

    /// Embedding dimensionality the index was built with
    #[arg(long, default_value_t = config::DEFAULT_EMBEDDING_DIM)]
    dimension: usize,

    /// Skip the startup reachability checks against both services
    #[arg(long, default_value_t = false)]
    skip_startup_checks: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(
                    "cinesearch_server=info"
                        .parse()
                        .expect("valid directive literal"),
                )
                .add_directive(
                    "cinesearch_core=info"
                        .parse()
                        .expect("valid directive literal"),
                ),
        )
        .init();

    let args = Args::parse();

    if args.port == 0 {
        eprintln!("Error: port must be > 0");
        std::process::exit(1);
    }
    if args.dimension == 0 {
        eprintln!("Error: dimension must be > 0");
        std::process::exit(1);
    }

    let index_api_key = std::env::var("CINESEARCH_INDEX_API_KEY").ok();
    if index_api_key.is_some() {
        tracing::info!("Index API key authentication enabled");
    }

    let index = Arc::new(ElasticIndex::new(
        &args.index_url,
        &args.index_name,
        index_api_key.as_deref(),
    )?);
    let embedder = Arc::new(HttpEmbedder::new(&args.embedder_url, args.dimension)?);

    // Misconfigured collaborators are fatal: fail before accepting traffic.
    if args.skip_startup_checks {
        tracing::warn!("Startup reachability checks skipped");
    } else {
        verify_collaborators(&index, &embedder).await?;
    }

    let prometheus_handle =
        metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let engine = Arc::new(SearchEngine::new(index, embedder));

    let state = AppState {
        engine,
        prometheus_handle,
        index_url: args.index_url.clone(),
        embedder_url: args.embedder_url.clone(),
        start_time: Instant::now(),
    };

    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", args.port);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        index_url = %args.index_url,
        index_name = %args.index_name,
        embedder_url = %args.embedder_url,
        dimension = args.dimension,
        "cinesearch ready"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    tracing::info!("All requests drained, goodbye");
    Ok(())
}

/// Startup reachability checks against both external services. A failure here
/// is a configuration error: the process must not accept traffic.
async fn verify_collaborators(
    index: &ElasticIndex,
    embedder: &HttpEmbedder,
) -> Result<(), SearchError> {
    index.ping().await.map_err(|e| {
        SearchError::Configuration(format!("search index is not reachable: {e}"))
    })?;
    embedder.verify().await.map_err(|e| {
        SearchError::Configuration(format!("embedding service failed verification: {e}"))
    })?;
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
