//! Error types for the listing workflow
//!
//! `ListingError` is what the orchestrator surfaces to callers. The lower-level
//! `ChainError` and `BackendError` come from the on-chain and backend clients
//! and are wrapped into the workflow variants.

use crate::services::transactor::OfferResult;

/// Failure of a single on-chain call
#[derive(Debug, Clone, PartialEq)]
pub enum ChainError {
    /// Wallet or signer refused to sign (includes seller/signer mismatch)
    Rejected(String),
    /// Transaction mined but reverted
    Reverted(String),
    ProviderError(String),
    InvalidResponse(String),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::Rejected(msg) => write!(f, "Rejected: {}", msg),
            ChainError::Reverted(msg) => write!(f, "Reverted: {}", msg),
            ChainError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            ChainError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}

/// Failure of a backend HTTP call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Request did not complete within the configured timeout
    Timeout,
    /// Backend answered with a non-success status
    Rejected { status: u16, body: String },
    /// Connection-level failure before a response was received
    Transport(String),
    InvalidResponse(String),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Timeout)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Timeout => write!(f, "Backend timeout"),
            BackendError::Rejected { status, body } => {
                write!(f, "Backend rejected request ({}): {}", status, body)
            }
            BackendError::Transport(msg) => write!(f, "Backend transport error: {}", msg),
            BackendError::InvalidResponse(msg) => write!(f, "Invalid backend response: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

/// Fatal outcome of a listing attempt
///
/// None of these variants dispatch a state update or a navigation signal.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingError {
    /// Input rejected before any external call
    InvalidRequest(String),
    /// Oracle read failed or returned a non-positive / unusable value.
    /// No on-chain writes were attempted.
    OracleUnavailable(String),
    /// Approval was not confirmed. The offer was not submitted.
    ApprovalFailed(ChainError),
    /// Offer failed after approval confirmed. The granted allowance stays in
    /// place; it is not revoked.
    OfferFailed {
        approval_tx_hash: String,
        error: ChainError,
    },
    /// Mint record could not be persisted. The on-chain offer already exists
    /// and is not rolled back.
    MintPersistFailed {
        offer: OfferResult,
        error: BackendError,
    },
    /// Cancellation observed between two steps
    Cancelled { step: &'static str },
}

impl std::fmt::Display for ListingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingError::InvalidRequest(msg) => write!(f, "Invalid listing request: {}", msg),
            ListingError::OracleUnavailable(msg) => write!(f, "Price oracle unavailable: {}", msg),
            ListingError::ApprovalFailed(e) => write!(f, "Approval failed: {}", e),
            ListingError::OfferFailed { approval_tx_hash, error } => write!(
                f,
                "Offer failed after approval {}: {}",
                approval_tx_hash, error
            ),
            ListingError::MintPersistFailed { offer, error } => write!(
                f,
                "Mint persist failed after offer {}: {}",
                offer.offer_tx_hash, error
            ),
            ListingError::Cancelled { step } => write!(f, "Listing cancelled before {}", step),
        }
    }
}

impl std::error::Error for ListingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListingError::ApprovalFailed(e) => Some(e),
            ListingError::OfferFailed { error, .. } => Some(error),
            ListingError::MintPersistFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ListingError::ApprovalFailed(ChainError::Rejected("user denied".to_string()));
        assert!(err.to_string().contains("Approval failed"));
        assert!(err.to_string().contains("user denied"));

        let err = BackendError::Rejected {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_timeout_is_distinct_from_rejection() {
        assert!(BackendError::Timeout.is_timeout());
        assert!(
            !BackendError::Rejected {
                status: 408,
                body: String::new()
            }
            .is_timeout()
        );
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let err = ListingError::OfferFailed {
            approval_tx_hash: "0xabc".to_string(),
            error: ChainError::Reverted("insufficient allowance".to_string()),
        };
        assert!(err.source().is_some());
        assert!(ListingError::Cancelled { step: "offer" }.source().is_none());
    }
}
