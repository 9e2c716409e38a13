use axum::middleware::from_fn;
use clap::Parser;
use dotenvy::dotenv;
use image_gallery::api::middleware::request_id::{REQUEST_ID_HEADER, request_id_middleware};
use image_gallery::config::AppConfig;
use image_gallery::infrastructure::{database, labeling, storage};
use image_gallery::services::image_service::ImageService;
use image_gallery::{AppState, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the API server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Refuse to start without production settings (JWT_SECRET)
    #[arg(long)]
    production: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initial Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "image_gallery=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting Image Gallery...");

    let mut config = if args.production {
        AppConfig::production()?
    } else {
        AppConfig::from_env()
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    let config = Arc::new(config);
    info!(
        "🛡️  Config: Bucket={}, Region={}, Auto-tagging={}, Max Size={}MB",
        config.s3_bucket,
        config.aws_region,
        config.auto_tagging,
        config.max_file_size / 1024 / 1024
    );

    // 2. Setup Infrastructure
    let db = database::setup_database(&config.database_url).await?;
    let aws_config = storage::load_aws_config(&config).await;
    let storage_service = storage::setup_storage(&config, &aws_config).await;
    let label_detector = labeling::setup_label_detector(&config, &aws_config);

    let image_service = Arc::new(ImageService::new(
        storage_service.clone(),
        label_detector,
        config.clone(),
    ));

    let shutdown = CancellationToken::new();
    let state = AppState {
        db,
        storage: storage_service,
        image_service,
        config: config.clone(),
        shutdown: shutdown.clone(),
    };

    // 3. Configure tracing layer for HTTP requests
    let trace_layer = TraceLayer::new_for_http()
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
        );

    // Request ids are assigned outside the trace layer so spans can see them
    let app = create_app(state)
        .layer(trace_layer)
        .layer(from_fn(request_id_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", config.port);
    info!(
        "📖 Swagger UI documentation: http://localhost:{}/swagger-ui",
        config.port
    );

    // 4. Serve until a shutdown signal arrives
    let server_shutdown = shutdown.clone();
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
    {
        error!("❌ Server runtime error: {}", e);
        return Err(e.into());
    }

    info!("👋 Server exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
