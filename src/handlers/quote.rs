//! Quote Handler
//!
//! GET /api/quote?fiatPrice=100 previews the token amount a listing would use.
//! Performs one oracle read and nothing else.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use tracing::warn;

use crate::AppState;
use crate::handlers::listing::error_response;
use crate::models::listing::{ListingErrorResponse, QuoteQuery, QuoteResponse};

pub async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>, (StatusCode, Json<ListingErrorResponse>)> {
    let quote = state
        .orchestrator
        .quote(query.fiat_price)
        .await
        .map_err(|e| {
            warn!(error = %e, fiat_price = %query.fiat_price, "Quote failed");
            error_response(&e)
        })?;

    Ok(Json(QuoteResponse::from(&quote)))
}
