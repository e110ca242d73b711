use std::env;
use std::sync::Arc;

use tokenized_videos::config::Config;
use tokenized_videos::models::listing::ListingResponse;
use tokenized_videos::services::{
    backend::HttpBackendClient,
    listing::{ListingOrchestrator, ListingRequest},
    marketplace::MarketplaceClient,
    transactor::OnChainTransactor,
    video_state::{RouteRecorder, VideoStore},
};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <fiat-price> <token-uri>", args[0]);
        eprintln!("Example: {} 100 QmTokenizedVideo", args[0]);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tokenized_videos=debug".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let marketplace = Arc::new(MarketplaceClient::new(&config).await?);
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
    let orchestrator =
        ListingOrchestrator::new(marketplace.clone(), transactor, backend, Arc::new(videos));

    let request = ListingRequest::parse(
        &args[1],
        &args[2],
        &marketplace.signer_address().to_string(),
    )?;

    // Ctrl+C before the approval is broadcast aborts the listing
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let navigator = RouteRecorder::new();
    match orchestrator.list_video(&request, &navigator, &cancel).await {
        Ok(outcome) => {
            let response = ListingResponse::from(&outcome);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Listing failed: {}", e);
            std::process::exit(2);
        }
    }
}
