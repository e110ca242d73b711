//! On-Chain Transactor
//!
//! Submits the ERC-20 approval and then the marketplace offer. The offer is
//! only built once the approval receipt is confirmed; each transaction is sent
//! exactly once per call and nothing is retried here.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{ChainError, ListingError};
use crate::services::price_converter::TokenAmount;

/// A mined, successful transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedTx {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait TokenApprover: Send + Sync {
    /// Grant `spender` an allowance of `amount` base units from `owner`.
    /// Resolves once the transaction is confirmed.
    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<ConfirmedTx, ChainError>;
}

#[async_trait]
pub trait OfferSubmitter: Send + Sync {
    /// Place a sale offer for `token_uri` at `amount` base units.
    /// Resolves once the transaction is confirmed.
    async fn submit_offer(
        &self,
        seller: Address,
        token_uri: Bytes,
        amount: U256,
    ) -> Result<ConfirmedTx, ChainError>;
}

/// Both confirmed transactions of a successful approve+offer
#[derive(Debug, Clone, PartialEq)]
pub struct OfferResult {
    pub approval_tx_hash: String,
    pub approval_block: Option<u64>,
    pub offer_tx_hash: String,
    pub offer_block: Option<u64>,
    /// `0x`-prefixed hex of the UTF-8 token URI
    pub token_uri_hex: String,
    pub amount: U256,
}

/// `0x`-prefixed hex encoding of the UTF-8 bytes of `token_uri`
pub fn token_uri_hex(token_uri: &str) -> String {
    format!("0x{}", hex::encode(token_uri.as_bytes()))
}

#[derive(Clone)]
pub struct OnChainTransactor {
    approver: Arc<dyn TokenApprover>,
    offers: Arc<dyn OfferSubmitter>,
    spender: Address,
}

impl OnChainTransactor {
    /// `spender` is the marketplace contract that pulls tokens on sale
    pub fn new(
        approver: Arc<dyn TokenApprover>,
        offers: Arc<dyn OfferSubmitter>,
        spender: Address,
    ) -> Self {
        Self {
            approver,
            offers,
            spender,
        }
    }

    /// Approve `amount` for the marketplace, then place the offer.
    ///
    /// On approval failure the offer is never submitted. On offer failure
    /// the confirmed allowance is left in place.
    pub async fn approve_and_offer(
        &self,
        amount: &TokenAmount,
        token_uri: &str,
        seller: Address,
        cancel: &CancellationToken,
    ) -> Result<OfferResult, ListingError> {
        info!(
            seller = %seller,
            spender = %self.spender,
            base_units = %amount.base_units,
            "Submitting approval"
        );

        let approval = self
            .approver
            .approve(seller, self.spender, amount.base_units)
            .await
            .map_err(|e| {
                error!(error = %e, seller = %seller, "Approval failed");
                ListingError::ApprovalFailed(e)
            })?;

        info!(
            tx_hash = %approval.tx_hash,
            block = ?approval.block_number,
            "Approval confirmed"
        );

        if cancel.is_cancelled() {
            return Err(ListingError::Cancelled { step: "offer" });
        }

        let uri_hex = token_uri_hex(token_uri);
        info!(token_uri = %token_uri, token_uri_hex = %uri_hex, "Submitting offer");

        let offer = self
            .offers
            .submit_offer(
                seller,
                Bytes::copy_from_slice(token_uri.as_bytes()),
                amount.base_units,
            )
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    approval_tx = %approval.tx_hash,
                    "Offer failed after approval; allowance remains granted"
                );
                ListingError::OfferFailed {
                    approval_tx_hash: approval.tx_hash.clone(),
                    error: e,
                }
            })?;

        info!(
            tx_hash = %offer.tx_hash,
            block = ?offer.block_number,
            "Offer confirmed"
        );

        Ok(OfferResult {
            approval_tx_hash: approval.tx_hash,
            approval_block: approval.block_number,
            offer_tx_hash: offer.tx_hash,
            offer_block: offer.block_number,
            token_uri_hex: uri_hex,
            amount: amount.base_units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fakes::{ChainCall, FakeChain};
    use crate::services::price_converter::to_base_units;
    use alloy::primitives::address;
    use rust_decimal_macros::dec;

    const SPENDER: Address = address!("1111111111111111111111111111111111111111");
    const SELLER: Address = address!("2222222222222222222222222222222222222222");

    fn fifty_tokens() -> TokenAmount {
        TokenAmount {
            value: dec!(50),
            base_units: to_base_units(dec!(50)).unwrap(),
        }
    }

    fn transactor(chain: &Arc<FakeChain>) -> OnChainTransactor {
        OnChainTransactor::new(chain.clone(), chain.clone(), SPENDER)
    }

    #[test]
    fn test_token_uri_hex() {
        assert_eq!(token_uri_hex("abc"), "0x616263");
        assert_eq!(token_uri_hex(""), "0x");
    }

    #[tokio::test]
    async fn test_approval_then_offer() {
        let chain = Arc::new(FakeChain::new());

        let result = transactor(&chain)
            .approve_and_offer(&fifty_tokens(), "QmVideo", SELLER, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.token_uri_hex, token_uri_hex("QmVideo"));
        assert_eq!(result.amount.to_string(), "50000000000000000000");
        assert_eq!(result.approval_block, Some(1001));
        assert_eq!(result.offer_block, Some(1002));

        let calls = chain.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            ChainCall::Approve {
                owner: SELLER,
                spender: SPENDER,
                amount: result.amount,
            }
        );
        assert_eq!(
            calls[1],
            ChainCall::Offer {
                seller: SELLER,
                token_uri_hex: token_uri_hex("QmVideo"),
                amount: result.amount,
            }
        );
    }

    #[tokio::test]
    async fn test_rejected_approval_skips_offer() {
        let chain = Arc::new(FakeChain::new().reject_approval("user denied signature"));

        let result = transactor(&chain)
            .approve_and_offer(&fifty_tokens(), "QmVideo", SELLER, &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(ListingError::ApprovalFailed(ChainError::Rejected(_)))
        ));
        assert_eq!(chain.offer_count(), 0);
    }

    #[tokio::test]
    async fn test_reverted_offer_keeps_approval() {
        let chain = Arc::new(FakeChain::new().revert_offer("execution reverted"));

        let result = transactor(&chain)
            .approve_and_offer(&fifty_tokens(), "QmVideo", SELLER, &CancellationToken::new())
            .await;

        match result {
            Err(ListingError::OfferFailed {
                approval_tx_hash,
                error,
            }) => {
                assert!(!approval_tx_hash.is_empty());
                assert!(matches!(error, ChainError::Reverted(_)));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(chain.approval_count(), 1);
        assert_eq!(chain.offer_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_approval() {
        let chain = Arc::new(FakeChain::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = transactor(&chain)
            .approve_and_offer(&fifty_tokens(), "QmVideo", SELLER, &cancel)
            .await;

        assert_eq!(result, Err(ListingError::Cancelled { step: "offer" }));
        assert_eq!(chain.approval_count(), 1);
        assert_eq!(chain.offer_count(), 0);
    }
}
