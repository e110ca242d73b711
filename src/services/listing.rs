//! Listing Orchestrator
//!
//! Runs one listing end to end:
//! price conversion -> approval -> offer -> offer mirror -> mint record ->
//! state update + navigation.
//!
//! Every step is awaited before the next begins. The workflow is not
//! idempotent: running it twice with the same request submits two approvals,
//! two offers and two sets of backend writes, so callers must guard against
//! double submission.

use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::ListingError;
use crate::services::backend::{BackendClient, MintRequest, MintedToken, OfferRecord};
use crate::services::price_converter::{PriceOracle, PriceQuote, compute_token_amount};
use crate::services::transactor::{OfferResult, OnChainTransactor};
use crate::services::video_state::{Navigator, StateSink, nft_route};

/// Validated input of one listing attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRequest {
    fiat_price: Decimal,
    token_uri: String,
    seller: Address,
}

impl ListingRequest {
    pub fn new(
        fiat_price: Decimal,
        token_uri: impl Into<String>,
        seller: Address,
    ) -> Result<Self, ListingError> {
        let token_uri = token_uri.into();

        if fiat_price <= Decimal::ZERO {
            return Err(ListingError::InvalidRequest(format!(
                "fiat price must be positive, got {}",
                fiat_price
            )));
        }
        if token_uri.trim().is_empty() {
            return Err(ListingError::InvalidRequest(
                "token URI must not be empty".to_string(),
            ));
        }

        Ok(Self {
            fiat_price,
            token_uri,
            seller,
        })
    }

    /// Build a request from raw user input
    pub fn parse(fiat_price: &str, token_uri: &str, seller: &str) -> Result<Self, ListingError> {
        let fiat_price = Decimal::from_str(fiat_price.trim()).map_err(|e| {
            ListingError::InvalidRequest(format!("invalid fiat price '{}': {}", fiat_price, e))
        })?;
        let seller = Address::from_str(seller.trim()).map_err(|e| {
            ListingError::InvalidRequest(format!("invalid seller address '{}': {}", seller, e))
        })?;

        Self::new(fiat_price, token_uri, seller)
    }

    pub fn fiat_price(&self) -> Decimal {
        self.fiat_price
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub fn seller(&self) -> Address {
        self.seller
    }
}

/// Result of mirroring the on-chain offer to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum OfferMirror {
    Persisted,
    /// Mirror failed; the listing continued without it
    PersistFailedIgnored { reason: String },
}

impl OfferMirror {
    pub fn is_persisted(&self) -> bool {
        matches!(self, OfferMirror::Persisted)
    }
}

/// Successful listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListingOutcome {
    /// Log correlation id of this attempt
    pub listing_id: Uuid,
    pub token_uri: String,
    pub quote: PriceQuote,
    pub offer: OfferResult,
    pub offer_mirror: OfferMirror,
    pub minted: MintedToken,
    /// Navigation target that was emitted
    pub route: String,
}

#[derive(Clone)]
pub struct ListingOrchestrator {
    oracle: Arc<dyn PriceOracle>,
    transactor: OnChainTransactor,
    backend: Arc<dyn BackendClient>,
    state: Arc<dyn StateSink>,
}

impl ListingOrchestrator {
    pub fn new(
        oracle: Arc<dyn PriceOracle>,
        transactor: OnChainTransactor,
        backend: Arc<dyn BackendClient>,
        state: Arc<dyn StateSink>,
    ) -> Self {
        Self {
            oracle,
            transactor,
            backend,
            state,
        }
    }

    /// Quote only: convert a fiat price without touching the chain's write side
    pub async fn quote(&self, fiat_price: Decimal) -> Result<PriceQuote, ListingError> {
        compute_token_amount(self.oracle.as_ref(), fiat_price).await
    }

    /// List a video for sale.
    ///
    /// Cancellation is honoured only before an on-chain transaction is
    /// submitted. Once the offer is confirmed the backend steps always run.
    pub async fn list_video(
        &self,
        request: &ListingRequest,
        navigator: &dyn Navigator,
        cancel: &CancellationToken,
    ) -> Result<ListingOutcome, ListingError> {
        let listing_id = Uuid::new_v4();
        let span = info_span!(
            "list_video",
            listing_id = %listing_id,
            token_uri = %request.token_uri,
            seller = %request.seller,
        );

        self.run(listing_id, request, navigator, cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        listing_id: Uuid,
        request: &ListingRequest,
        navigator: &dyn Navigator,
        cancel: &CancellationToken,
    ) -> Result<ListingOutcome, ListingError> {
        info!(fiat_price = %request.fiat_price, "Listing started");

        if cancel.is_cancelled() {
            return Err(ListingError::Cancelled { step: "price conversion" });
        }

        let quote = compute_token_amount(self.oracle.as_ref(), request.fiat_price).await?;

        info!(
            exchange_rate = %quote.exchange_rate,
            token_amount = %quote.token_amount.value,
            "Token amount computed"
        );

        if cancel.is_cancelled() {
            return Err(ListingError::Cancelled { step: "approval" });
        }

        let offer = self
            .transactor
            .approve_and_offer(&quote.token_amount, &request.token_uri, request.seller, cancel)
            .await?;

        let offer_mirror = match self
            .backend
            .persist_offer(&OfferRecord {
                token_uri_str: request.token_uri.clone(),
            })
            .await
        {
            Ok(()) => {
                info!("Offer mirrored to backend");
                OfferMirror::Persisted
            }
            Err(e) => {
                warn!(
                    error = %e,
                    offer_tx = %offer.offer_tx_hash,
                    "Offer mirror failed; continuing with mint"
                );
                OfferMirror::PersistFailedIgnored {
                    reason: e.to_string(),
                }
            }
        };

        let mint_request = MintRequest {
            token_uri_hex: offer.token_uri_hex.clone(),
            token_uri_str: request.token_uri.clone(),
            token_creator: request.seller.to_string(),
        };

        let minted = match self.backend.persist_mint(&mint_request).await {
            Ok(minted) => minted,
            Err(e) => {
                error!(
                    error = %e,
                    timeout = e.is_timeout(),
                    approval_tx = %offer.approval_tx_hash,
                    offer_tx = %offer.offer_tx_hash,
                    offer_block = ?offer.offer_block,
                    "Mint persist failed; on-chain offer stays in place"
                );
                return Err(ListingError::MintPersistFailed { offer, error: e });
            }
        };

        info!(token_id = %minted.token_id, "Mint recorded");

        let route = nft_route(&request.token_uri);
        self.state.video_added(&request.token_uri);
        navigator.navigate(&route);

        info!(route = %route, "Listing completed");

        Ok(ListingOutcome {
            listing_id,
            token_uri: request.token_uri.clone(),
            quote,
            offer,
            offer_mirror,
            minted,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, ChainError};
    use crate::services::fakes::{BackendCall, FakeBackend, FakeChain, FakeOracle};
    use crate::services::transactor::token_uri_hex;
    use crate::services::video_state::{RouteRecorder, VideoStore};
    use alloy::primitives::address;
    use rust_decimal_macros::dec;

    const MARKETPLACE: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
    const SELLER: Address = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const TOKEN_URI: &str = "QmTokenizedVideo";

    struct Harness {
        oracle: Arc<FakeOracle>,
        chain: Arc<FakeChain>,
        backend: Arc<FakeBackend>,
        store: VideoStore,
        navigator: RouteRecorder,
        orchestrator: ListingOrchestrator,
    }

    fn harness(oracle: FakeOracle, chain: FakeChain, backend: FakeBackend) -> Harness {
        let oracle = Arc::new(oracle);
        let chain = Arc::new(chain);
        let backend = Arc::new(backend);
        let store = VideoStore::new();

        let transactor = OnChainTransactor::new(chain.clone(), chain.clone(), MARKETPLACE);
        let orchestrator = ListingOrchestrator::new(
            oracle.clone(),
            transactor,
            backend.clone(),
            Arc::new(store.clone()),
        );

        Harness {
            oracle,
            chain,
            backend,
            store,
            navigator: RouteRecorder::new(),
            orchestrator,
        }
    }

    fn request() -> ListingRequest {
        ListingRequest::new(dec!(100), TOKEN_URI, SELLER).unwrap()
    }

    async fn list(h: &Harness) -> Result<ListingOutcome, ListingError> {
        h.orchestrator
            .list_video(&request(), &h.navigator, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_successful_listing() {
        let h = harness(
            FakeOracle::with_price(200_000_000),
            FakeChain::new(),
            FakeBackend::new().minting("17"),
        );

        let outcome = list(&h).await.unwrap();

        assert_eq!(outcome.quote.token_amount.value, dec!(50));
        assert_eq!(outcome.offer.amount.to_string(), "50000000000000000000");
        assert_eq!(outcome.offer_mirror, OfferMirror::Persisted);
        assert_eq!(outcome.minted.token_id, "17");
        assert_eq!(outcome.route, "/nft/QmTokenizedVideo");

        assert_eq!(
            h.backend.calls(),
            vec![
                BackendCall::Offer(OfferRecord {
                    token_uri_str: TOKEN_URI.to_string()
                }),
                BackendCall::Mint(MintRequest {
                    token_uri_hex: token_uri_hex(TOKEN_URI),
                    token_uri_str: TOKEN_URI.to_string(),
                    token_creator: SELLER.to_string(),
                }),
            ]
        );

        let state = h.store.snapshot();
        assert_eq!(state.videos.len(), 1);
        assert_eq!(state.current.as_deref(), Some(TOKEN_URI));
        assert_eq!(h.navigator.routes(), vec!["/nft/QmTokenizedVideo".to_string()]);
    }

    #[tokio::test]
    async fn test_oracle_failure_stops_everything() {
        let h = harness(FakeOracle::failing("call reverted"), FakeChain::new(), FakeBackend::new());

        let result = list(&h).await;

        assert!(matches!(result, Err(ListingError::OracleUnavailable(_))));
        assert!(h.chain.calls().is_empty());
        assert!(h.backend.calls().is_empty());
        assert!(h.store.is_empty());
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_approval_failure_has_no_side_effects() {
        let h = harness(
            FakeOracle::with_price(200_000_000),
            FakeChain::new().reject_approval("user rejected"),
            FakeBackend::new(),
        );

        let result = list(&h).await;

        assert!(matches!(result, Err(ListingError::ApprovalFailed(_))));
        assert_eq!(h.chain.offer_count(), 0);
        assert!(h.backend.calls().is_empty());
        assert!(h.store.is_empty());
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_offer_revert_has_no_backend_calls() {
        let h = harness(
            FakeOracle::with_price(200_000_000),
            FakeChain::new().revert_offer("execution reverted"),
            FakeBackend::new(),
        );

        let result = list(&h).await;

        assert!(matches!(
            result,
            Err(ListingError::OfferFailed {
                error: ChainError::Reverted(_),
                ..
            })
        ));
        assert_eq!(h.chain.approval_count(), 1);
        assert!(h.backend.calls().is_empty());
        assert!(h.store.is_empty());
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_offer_mirror_failure_is_tolerated() {
        let h = harness(
            FakeOracle::with_price(200_000_000),
            FakeChain::new(),
            FakeBackend::new().failing_offer(BackendError::Rejected {
                status: 500,
                body: "boom".to_string(),
            }),
        );

        let outcome = list(&h).await.unwrap();

        assert!(matches!(
            outcome.offer_mirror,
            OfferMirror::PersistFailedIgnored { .. }
        ));
        assert_eq!(h.backend.mint_count(), 1);
        assert_eq!(h.store.len(), 1);
        assert_eq!(h.navigator.routes().len(), 1);
    }

    #[tokio::test]
    async fn test_mint_failure_reports_offer_and_skips_state() {
        let h = harness(
            FakeOracle::with_price(200_000_000),
            FakeChain::new(),
            FakeBackend::new().failing_mint(BackendError::Timeout),
        );

        let result = list(&h).await;

        match result {
            Err(ListingError::MintPersistFailed { offer, error }) => {
                assert!(error.is_timeout());
                assert_eq!(offer.token_uri_hex, token_uri_hex(TOKEN_URI));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(h.chain.offer_count(), 1);
        assert!(h.store.is_empty());
        assert!(h.navigator.routes().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let h = harness(FakeOracle::with_price(200_000_000), FakeChain::new(), FakeBackend::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h
            .orchestrator
            .list_video(&request(), &h.navigator, &cancel)
            .await;

        assert_eq!(
            result,
            Err(ListingError::Cancelled {
                step: "price conversion"
            })
        );
        assert_eq!(h.oracle.call_count(), 0);
        assert!(h.chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_during_price_conversion_skips_approval() {
        let cancel = CancellationToken::new();
        let h = harness(
            FakeOracle::with_price(200_000_000).cancelling(cancel.clone()),
            FakeChain::new(),
            FakeBackend::new(),
        );

        let result = h
            .orchestrator
            .list_video(&request(), &h.navigator, &cancel)
            .await;

        assert_eq!(result, Err(ListingError::Cancelled { step: "approval" }));
        assert_eq!(h.oracle.call_count(), 1);
        assert!(h.chain.calls().is_empty());
        assert!(h.backend.calls().is_empty());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_offer_mirror_timeout_is_tolerated() {
        let h = harness(
            FakeOracle::with_price(200_000_000),
            FakeChain::new(),
            FakeBackend::new().failing_offer(BackendError::Timeout),
        );

        let outcome = list(&h).await.unwrap();

        assert_eq!(
            outcome.offer_mirror,
            OfferMirror::PersistFailedIgnored {
                reason: BackendError::Timeout.to_string()
            }
        );
        assert_eq!(h.backend.mint_count(), 1);
        assert_eq!(h.store.len(), 1);
        assert_eq!(h.navigator.routes(), vec!["/nft/QmTokenizedVideo".to_string()]);
    }

    #[tokio::test]
    async fn test_not_idempotent() {
        let h = harness(FakeOracle::with_price(200_000_000), FakeChain::new(), FakeBackend::new());

        list(&h).await.unwrap();
        list(&h).await.unwrap();

        assert_eq!(h.oracle.call_count(), 2);
        assert_eq!(h.chain.approval_count(), 2);
        assert_eq!(h.chain.offer_count(), 2);
        assert_eq!(h.backend.mint_count(), 2);
        assert_eq!(h.store.len(), 2);
    }

    #[test]
    fn test_request_validation() {
        assert!(ListingRequest::new(dec!(0), TOKEN_URI, SELLER).is_err());
        assert!(ListingRequest::new(dec!(-3), TOKEN_URI, SELLER).is_err());
        assert!(ListingRequest::new(dec!(1), "  ", SELLER).is_err());

        let parsed = ListingRequest::parse(
            " 12.50 ",
            TOKEN_URI,
            "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
        )
        .unwrap();
        assert_eq!(parsed.fiat_price(), dec!(12.50));
        assert_eq!(parsed.seller(), SELLER);

        assert!(ListingRequest::parse("abc", TOKEN_URI, &SELLER.to_string()).is_err());
        assert!(ListingRequest::parse("1", TOKEN_URI, "0x1234").is_err());
    }
}
