//! Listing request/response models
//!
//! Models for POST /api/listings and GET /api/quote.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, ListingError};
use crate::services::listing::{ListingOutcome, OfferMirror};
use crate::services::price_converter::PriceQuote;

/// Request to list a video for sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingRequest {
    /// Price in fiat (e.g., "100" or 100 for $100)
    #[serde(rename = "fiatPrice")]
    pub fiat_price: Decimal,
    /// Video asset identifier
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
    /// Seller wallet; defaults to the server's signer
    #[serde(rename = "sellerAddress", default)]
    pub seller_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub listing_id: String,
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
    pub exchange_rate: String,
    pub token_amount: String,
    /// Base units sent on chain (18 decimals)
    pub base_units: String,
    pub approval_tx_hash: String,
    pub offer_tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_block: Option<u64>,
    pub offer_mirrored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_mirror_error: Option<String>,
    pub minted_token_id: String,
    /// Detail route to navigate to
    pub redirect: String,
}

impl From<&ListingOutcome> for ListingResponse {
    fn from(outcome: &ListingOutcome) -> Self {
        let offer_mirror_error = match &outcome.offer_mirror {
            OfferMirror::Persisted => None,
            OfferMirror::PersistFailedIgnored { reason } => Some(reason.clone()),
        };

        Self {
            listing_id: outcome.listing_id.to_string(),
            token_uri: outcome.token_uri.clone(),
            exchange_rate: outcome.quote.exchange_rate.normalize().to_string(),
            token_amount: outcome.quote.token_amount.value.normalize().to_string(),
            base_units: outcome.quote.token_amount.base_units_string(),
            approval_tx_hash: outcome.offer.approval_tx_hash.clone(),
            offer_tx_hash: outcome.offer.offer_tx_hash.clone(),
            offer_block: outcome.offer.offer_block,
            offer_mirrored: outcome.offer_mirror.is_persisted(),
            offer_mirror_error,
            minted_token_id: outcome.minted.token_id.clone(),
            redirect: outcome.route.clone(),
        }
    }
}

/// Error body for failed listings
///
/// Carries the hashes of any transactions that were already confirmed, since
/// those are not rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingErrorResponse {
    pub error: String,
    pub kind: String,
    /// Backend failure kind for `MintPersistFailed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_tx_hash: Option<String>,
}

impl ListingErrorResponse {
    pub fn message(kind: &str, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: kind.to_string(),
            cause: None,
            approval_tx_hash: None,
            offer_tx_hash: None,
        }
    }
}

impl From<&ListingError> for ListingErrorResponse {
    fn from(err: &ListingError) -> Self {
        let mut body = Self::message(kind_of(err), err.to_string());

        match err {
            ListingError::OfferFailed { approval_tx_hash, .. } => {
                body.approval_tx_hash = Some(approval_tx_hash.clone());
            }
            ListingError::MintPersistFailed { offer, error } => {
                body.cause = Some(backend_kind(error).to_string());
                body.approval_tx_hash = Some(offer.approval_tx_hash.clone());
                body.offer_tx_hash = Some(offer.offer_tx_hash.clone());
            }
            _ => {}
        }

        body
    }
}

fn kind_of(err: &ListingError) -> &'static str {
    match err {
        ListingError::InvalidRequest(_) => "InvalidRequest",
        ListingError::OracleUnavailable(_) => "OracleUnavailable",
        ListingError::ApprovalFailed(_) => "ApprovalFailed",
        ListingError::OfferFailed { .. } => "OfferFailed",
        ListingError::MintPersistFailed { .. } => "MintPersistFailed",
        ListingError::Cancelled { .. } => "Cancelled",
    }
}

fn backend_kind(err: &BackendError) -> &'static str {
    match err {
        BackendError::Timeout => "BackendTimeout",
        BackendError::Rejected { .. } => "BackendRejected",
        BackendError::Transport(_) => "BackendTransport",
        BackendError::InvalidResponse(_) => "BackendInvalidResponse",
    }
}

/// Query parameters for GET /api/quote
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteQuery {
    #[serde(rename = "fiatPrice")]
    pub fiat_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub fiat_price: String,
    pub exchange_rate: String,
    pub token_amount: String,
    pub base_units: String,
}

impl From<&PriceQuote> for QuoteResponse {
    fn from(quote: &PriceQuote) -> Self {
        Self {
            fiat_price: quote.fiat_price.normalize().to_string(),
            exchange_rate: quote.exchange_rate.normalize().to_string(),
            token_amount: quote.token_amount.value.normalize().to_string(),
            base_units: quote.token_amount.base_units_string(),
        }
    }
}
