// src/lib.rs

use alloy::primitives::Address;
use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::{listing::ListingOrchestrator, submission_guard::SubmissionGuard, video_state::VideoStore};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ListingOrchestrator,
    pub videos: VideoStore,
    pub submissions: SubmissionGuard,
    /// Seller used when a request omits `sellerAddress`
    pub default_seller: Option<Address>,
    /// Cancelled on shutdown; listings check a child token between steps
    pub shutdown: CancellationToken,
}

pub mod config;
pub mod error;

pub mod services {
    pub mod backend;
    #[cfg(any(test, feature = "test-fakes"))]
    pub mod fakes;
    pub mod listing;
    pub mod marketplace;
    pub mod price_converter;
    pub mod submission_guard;
    pub mod transactor;
    pub mod video_state;
}

pub mod models {
    pub mod listing;
    pub mod video;
}

pub mod handlers {
    pub mod listing;
    pub mod quote;
    pub mod videos;
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/listings", post(handlers::listing::create_listing))
        .route("/api/quote", get(handlers::quote::get_quote))
        .route("/api/videos", get(handlers::videos::get_videos))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
