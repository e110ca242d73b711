use std::sync::Arc;

use alloy::primitives::{Address, address};
use tokenized_videos::AppState;
use tokenized_videos::services::{
    fakes::{FakeBackend, FakeChain, FakeOracle},
    listing::ListingOrchestrator,
    submission_guard::SubmissionGuard,
    transactor::OnChainTransactor,
    video_state::VideoStore,
};
use tokio_util::sync::CancellationToken;

pub const MARKETPLACE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
pub const SELLER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// App state wired to in-memory fakes, plus handles to inspect them
pub struct TestApp {
    pub state: AppState,
    pub chain: Arc<FakeChain>,
    pub backend: Arc<FakeBackend>,
}

pub fn test_app(oracle: FakeOracle, chain: FakeChain, backend: FakeBackend) -> TestApp {
    let chain = Arc::new(chain);
    let backend = Arc::new(backend);
    let videos = VideoStore::new();

    let transactor = OnChainTransactor::new(chain.clone(), chain.clone(), MARKETPLACE);
    let orchestrator = ListingOrchestrator::new(
        Arc::new(oracle),
        transactor,
        backend.clone(),
        Arc::new(videos.clone()),
    );

    let state = AppState {
        orchestrator,
        videos,
        submissions: SubmissionGuard::new(),
        default_seller: Some(SELLER),
        shutdown: CancellationToken::new(),
    };

    TestApp {
        state,
        chain,
        backend,
    }
}
