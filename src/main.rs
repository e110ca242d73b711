use std::sync::Arc;

use tokenized_videos::{
    AppState, build_router,
    config::Config,
    services::{
        backend::HttpBackendClient, listing::ListingOrchestrator, marketplace::MarketplaceClient,
        submission_guard::SubmissionGuard, transactor::OnChainTransactor, video_state::VideoStore,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tokenized_videos=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().expect("Invalid configuration");
    info!(config = ?config, "Configuration loaded");

    let marketplace = Arc::new(
        MarketplaceClient::new(&config)
            .await
            .expect("Failed to initialize marketplace client"),
    );
    let backend = Arc::new(HttpBackendClient::new(
        config.backend_url.clone(),
        config.backend_timeout,
    ));
    let videos = VideoStore::new();

    let transactor = OnChainTransactor::new(
        marketplace.clone(),
        marketplace.clone(),
        marketplace.marketplace_address(),
    );
    let orchestrator = ListingOrchestrator::new(
        marketplace.clone(),
        transactor,
        backend,
        Arc::new(videos.clone()),
    );

    let shutdown = CancellationToken::new();
    let state = AppState {
        orchestrator,
        videos,
        submissions: SubmissionGuard::new(),
        default_seller: Some(marketplace.signer_address()),
        shutdown: shutdown.clone(),
    };

    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");

    info!(
        address = %listener.local_addr().expect("Listener has no local address"),
        "Server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("Server error");

    info!("Server shut down");
}

/// Resolves on SIGINT/SIGTERM after cancelling `shutdown`, so listings that
/// have not yet broadcast a transaction stop at their next step boundary.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }

    shutdown.cancel();
}
