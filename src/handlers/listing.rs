//! Listing Handler
//!
//! POST /api/listings runs the full listing workflow for one video.

use alloy::primitives::Address;
use axum::{Json, extract::State, http::StatusCode};
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::AppState;
use crate::error::{BackendError, ListingError};
use crate::models::listing::{CreateListingRequest, ListingErrorResponse, ListingResponse};
use crate::services::listing::ListingRequest;
use crate::services::video_state::RouteRecorder;

/// List a video for sale
///
/// POST /api/listings
///
/// # Request
///
/// ```json
/// { "fiatPrice": "100", "tokenURI": "QmVideo", "sellerAddress": "0x7099..." }
/// ```
///
/// # Response
///
/// 201 with the confirmed transaction hashes, the minted token id and the
/// `redirect` route (`/nft/{tokenURI}`). A second submission for the same
/// seller and token URI while one is running gets 409. The listing keeps
/// running to completion if the client disconnects.
pub async fn create_listing(
    State(state): State<AppState>,
    Json(payload): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), (StatusCode, Json<ListingErrorResponse>)> {
    let seller = resolve_seller(&state, payload.seller_address.as_deref())?;

    let request = ListingRequest::new(payload.fiat_price, payload.token_uri, seller)
        .map_err(|e| error_response(&e))?;

    info!(
        token_uri = %request.token_uri(),
        seller = %seller,
        fiat_price = %request.fiat_price(),
        "Listing request received"
    );

    let permit = state
        .submissions
        .try_acquire(format!("{}:{}", seller, request.token_uri()))
        .ok_or_else(|| {
            warn!(token_uri = %request.token_uri(), "Listing already in progress");
            (
                StatusCode::CONFLICT,
                Json(ListingErrorResponse::message(
                    "AlreadyInProgress",
                    "a listing for this video is already in progress",
                )),
            )
        })?;

    // Detached from the connection: a client disconnect must not stop the
    // workflow between the offer and the backend writes. The permit is held
    // until the task ends.
    let orchestrator = state.orchestrator.clone();
    let cancel = state.shutdown.child_token();
    let token_uri = request.token_uri().to_string();
    let task = tokio::spawn(async move {
        let _permit = permit;
        let navigator = RouteRecorder::new();
        let result = orchestrator.list_video(&request, &navigator, &cancel).await;
        if let Err(e) = &result {
            error!(error = %e, token_uri = %request.token_uri(), "Listing failed");
        }
        result
    });

    let outcome = task
        .await
        .map_err(|e| {
            error!(error = %e, token_uri = %token_uri, "Listing task aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListingErrorResponse::message(
                    "Internal",
                    format!("listing task failed: {}", e),
                )),
            )
        })?
        .map_err(|e| error_response(&e))?;

    Ok((StatusCode::CREATED, Json(ListingResponse::from(&outcome))))
}

fn resolve_seller(
    state: &AppState,
    seller: Option<&str>,
) -> Result<Address, (StatusCode, Json<ListingErrorResponse>)> {
    match seller {
        Some(raw) => Address::from_str(raw.trim()).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ListingErrorResponse::message(
                    "InvalidRequest",
                    format!("invalid seller address '{}': {}", raw, e),
                )),
            )
        }),
        None => state.default_seller.ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ListingErrorResponse::message(
                    "InvalidRequest",
                    "sellerAddress is required",
                )),
            )
        }),
    }
}

pub(crate) fn status_for(err: &ListingError) -> StatusCode {
    match err {
        ListingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ListingError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ListingError::MintPersistFailed {
            error: BackendError::Timeout,
            ..
        } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub(crate) fn error_response(err: &ListingError) -> (StatusCode, Json<ListingErrorResponse>) {
    (status_for(err), Json(ListingErrorResponse::from(err)))
}
