use clap::Parser;
use dotenvy::dotenv;
use rust_file_registry::api::middleware::request_id::REQUEST_ID_HEADER;
use rust_file_registry::config::RegistryConfig;
use rust_file_registry::infrastructure::{database, storage};
use rust_file_registry::services::events::create_event_publisher;
use rust_file_registry::services::metadata_store::DbMetadataStore;
use rust_file_registry::services::registry::FileRegistry;
use rust_file_registry::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    // Initialize tracing with EnvFilter
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_file_registry=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Rust File Registry...");

    // Setup Infrastructure
    let db = database::setup_database().await?;
    let metadata_store = Arc::new(DbMetadataStore::new(db));
    let object_storages = storage::setup_object_storages().await;

    let config = RegistryConfig::from_env();
    info!(
        "📨 Event Config: register='{}', stage='{}', delete='{}', notify={}",
        config.files_to_register_type,
        config.files_to_stage_type,
        config.files_to_delete_type,
        config.notify_endpoint.as_deref().unwrap_or("log-only")
    );

    let event_publisher = Arc::from(create_event_publisher(&config));
    let registry = Arc::new(FileRegistry::new(
        metadata_store.clone(),
        object_storages.clone(),
        event_publisher,
    ));

    let state = AppState {
        registry,
        metadata_store,
        object_storages,
        config,
    };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Registry API listening on: http://0.0.0.0:{}", args.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
