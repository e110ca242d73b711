//! In-memory collaborators for tests
//!
//! Each fake records the calls it receives and can be configured to fail.

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{BackendError, ChainError};
use crate::services::backend::{BackendClient, MintRequest, MintedToken, OfferRecord};
use crate::services::price_converter::PriceOracle;
use crate::services::transactor::{ConfirmedTx, OfferSubmitter, TokenApprover};

pub struct FakeOracle {
    price: Result<i128, ChainError>,
    cancel_on_read: Option<CancellationToken>,
    calls: Mutex<usize>,
}

impl FakeOracle {
    /// Oracle answering `raw` (fiat per token, scaled by 10^8)
    pub fn with_price(raw: i128) -> Self {
        Self {
            price: Ok(raw),
            cancel_on_read: None,
            calls: Mutex::new(0),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            price: Err(ChainError::ProviderError(reason.into())),
            cancel_on_read: None,
            calls: Mutex::new(0),
        }
    }

    /// Cancel `token` while the price is being read
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_read = Some(token);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl PriceOracle for FakeOracle {
    async fn latest_price(&self) -> Result<i128, ChainError> {
        *self.calls.lock() += 1;
        if let Some(token) = &self.cancel_on_read {
            token.cancel();
        }
        self.price.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainCall {
    Approve {
        owner: Address,
        spender: Address,
        amount: U256,
    },
    Offer {
        seller: Address,
        token_uri_hex: String,
        amount: U256,
    },
}

/// Wallet + marketplace fake implementing both transaction traits
#[derive(Default)]
pub struct FakeChain {
    approval_error: Option<ChainError>,
    offer_error: Option<ChainError>,
    offer_delay: Option<Duration>,
    calls: Mutex<Vec<ChainCall>>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wallet refuses to sign the approval
    pub fn reject_approval(mut self, reason: impl Into<String>) -> Self {
        self.approval_error = Some(ChainError::Rejected(reason.into()));
        self
    }

    /// Offer transaction is mined but reverts
    pub fn revert_offer(mut self, reason: impl Into<String>) -> Self {
        self.offer_error = Some(ChainError::Reverted(reason.into()));
        self
    }

    /// Offer is broadcast immediately but confirms after `delay`
    pub fn confirm_offer_after(mut self, delay: Duration) -> Self {
        self.offer_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.calls.lock().clone()
    }

    pub fn approval_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ChainCall::Approve { .. }))
            .count()
    }

    pub fn offer_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ChainCall::Offer { .. }))
            .count()
    }

    fn record(&self, call: ChainCall) -> ConfirmedTx {
        let mut calls = self.calls.lock();
        calls.push(call);
        let n = calls.len() as u64;
        ConfirmedTx {
            tx_hash: format!("0x{:064x}", n),
            block_number: Some(1000 + n),
        }
    }
}

#[async_trait]
impl TokenApprover for FakeChain {
    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<ConfirmedTx, ChainError> {
        // A rejected signature never reaches the network.
        if let Some(err) = &self.approval_error {
            return Err(err.clone());
        }
        Ok(self.record(ChainCall::Approve {
            owner,
            spender,
            amount,
        }))
    }
}

#[async_trait]
impl OfferSubmitter for FakeChain {
    async fn submit_offer(
        &self,
        seller: Address,
        token_uri: Bytes,
        amount: U256,
    ) -> Result<ConfirmedTx, ChainError> {
        let receipt = self.record(ChainCall::Offer {
            seller,
            token_uri_hex: format!("0x{}", hex::encode(&token_uri)),
            amount,
        });
        if let Some(delay) = self.offer_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.offer_error {
            Some(err) => Err(err.clone()),
            None => Ok(receipt),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Offer(OfferRecord),
    Mint(MintRequest),
}

pub struct FakeBackend {
    offer_error: Option<BackendError>,
    mint_result: Result<MintedToken, BackendError>,
    calls: Mutex<Vec<BackendCall>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            offer_error: None,
            mint_result: Ok(MintedToken {
                token_id: "1".to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn minting(mut self, token_id: impl Into<String>) -> Self {
        self.mint_result = Ok(MintedToken {
            token_id: token_id.into(),
        });
        self
    }

    pub fn failing_offer(mut self, error: BackendError) -> Self {
        self.offer_error = Some(error);
        self
    }

    pub fn failing_mint(mut self, error: BackendError) -> Self {
        self.mint_result = Err(error);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn mint_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, BackendCall::Mint(_)))
            .count()
    }
}

#[async_trait]
impl BackendClient for FakeBackend {
    async fn persist_offer(&self, record: &OfferRecord) -> Result<(), BackendError> {
        self.calls.lock().push(BackendCall::Offer(record.clone()));
        match &self.offer_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn persist_mint(&self, request: &MintRequest) -> Result<MintedToken, BackendError> {
        self.calls.lock().push(BackendCall::Mint(request.clone()));
        self.mint_result.clone()
    }
}
