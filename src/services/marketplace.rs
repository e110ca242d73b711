//! Marketplace RPC client
//!
//! Talks to the marketplace contract (Chainlink-backed price read and the
//! offer book) and to the ERC-20 the offers are priced in. Implements the
//! oracle, approver and offer-submitter traits used by the listing workflow.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    sol,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::ChainError;
use crate::services::price_converter::PriceOracle;
use crate::services::transactor::{ConfirmedTx, OfferSubmitter, TokenApprover};

sol! {
    #[sol(rpc)]
    interface ITreasur {
        function chainLinkPrice() external view returns (int256);
        function offer(bytes calldata tokenURI, uint256 price) external;
    }

    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

pub struct MarketplaceClient {
    provider: RootProvider<Http<Client>>,
    rpc_url: Url,
    wallet: EthereumWallet,
    signer_address: Address,
    marketplace_address: Address,
    token_address: Address,
}

impl MarketplaceClient {
    /// Connect to the RPC endpoint and load the seller wallet
    ///
    /// # Errors
    ///
    /// Returns error if the key or URL is malformed or the node is unreachable
    pub async fn new(config: &Config) -> Result<Self, ChainError> {
        info!(
            rpc_url = %config.rpc_url,
            marketplace = %config.marketplace_address,
            token = %config.token_address,
            "Initializing MarketplaceClient"
        );

        let signer: PrivateKeySigner = config
            .private_key
            .trim()
            .parse()
            .map_err(|e| ChainError::ProviderError(format!("Invalid private key: {}", e)))?;
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let rpc_url: Url = config
            .rpc_url
            .parse()
            .map_err(|e| ChainError::ProviderError(format!("Invalid RPC URL: {}", e)))?;

        let provider = ProviderBuilder::new().on_http(rpc_url.clone());

        let chain_id = provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to connect to RPC");
            ChainError::ProviderError(format!("Connection failed: {}", e))
        })?;

        if let Some(expected) = config.expected_chain_id {
            if chain_id != expected {
                warn!(expected = expected, actual = chain_id, "Chain ID mismatch");
            }
        }

        info!(
            chain_id = chain_id,
            signer = %signer_address,
            "MarketplaceClient initialized successfully"
        );

        Ok(Self {
            provider,
            rpc_url,
            wallet,
            signer_address,
            marketplace_address: config.marketplace_address,
            token_address: config.token_address,
        })
    }

    /// Address of the wallet that signs approvals and offers
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub fn marketplace_address(&self) -> Address {
        self.marketplace_address
    }

    fn ensure_signer(&self, from: Address) -> Result<(), ChainError> {
        if from != self.signer_address {
            return Err(ChainError::Rejected(format!(
                "no signer for {} (wallet is {})",
                from, self.signer_address
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceOracle for MarketplaceClient {
    async fn latest_price(&self) -> Result<i128, ChainError> {
        let marketplace = ITreasur::new(self.marketplace_address, &self.provider);
        let result = marketplace.chainLinkPrice().call().await.map_err(|e| {
            ChainError::ProviderError(format!("chainLinkPrice failed: {}", e))
        })?;

        let raw = result._0;
        debug!(raw = %raw, "Oracle price read");

        raw.to_string()
            .parse::<i128>()
            .map_err(|e| ChainError::InvalidResponse(format!("oracle price {}: {}", raw, e)))
    }
}

#[async_trait]
impl TokenApprover for MarketplaceClient {
    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<ConfirmedTx, ChainError> {
        self.ensure_signer(owner)?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.clone());

        let token = IERC20::new(self.token_address, &provider);

        let pending_tx = token
            .approve(spender, amount)
            .from(owner)
            .send()
            .await
            .map_err(|e| send_error("approve", e))?;

        info!(tx_hash = %pending_tx.tx_hash(), "Approval sent, waiting for confirmation");

        let receipt = pending_tx.get_receipt().await.map_err(|e| {
            error!(error = %e, "Failed to get approval receipt");
            ChainError::ProviderError(format!("Receipt failed: {}", e))
        })?;

        confirmed(&receipt, "approve")
    }
}

#[async_trait]
impl OfferSubmitter for MarketplaceClient {
    async fn submit_offer(
        &self,
        seller: Address,
        token_uri: Bytes,
        amount: U256,
    ) -> Result<ConfirmedTx, ChainError> {
        self.ensure_signer(seller)?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.clone());

        let marketplace = ITreasur::new(self.marketplace_address, &provider);

        let pending_tx = marketplace
            .offer(token_uri, amount)
            .from(seller)
            .send()
            .await
            .map_err(|e| send_error("offer", e))?;

        info!(tx_hash = %pending_tx.tx_hash(), "Offer sent, waiting for confirmation");

        let receipt = pending_tx.get_receipt().await.map_err(|e| {
            error!(error = %e, "Failed to get offer receipt");
            ChainError::ProviderError(format!("Receipt failed: {}", e))
        })?;

        confirmed(&receipt, "offer")
    }
}

/// Gas estimation reverts surface here before anything is broadcast
fn send_error(method: &str, e: impl std::fmt::Display) -> ChainError {
    let message = format!("{} send failed: {}", method, e);
    error!(error = %message, "Failed to send transaction");
    if message.contains("revert") {
        ChainError::Reverted(message)
    } else {
        ChainError::ProviderError(message)
    }
}

fn confirmed(receipt: &TransactionReceipt, method: &str) -> Result<ConfirmedTx, ChainError> {
    let tx_hash = format!("{:?}", receipt.transaction_hash);

    if !receipt.status() {
        return Err(ChainError::Reverted(format!(
            "{} transaction {} reverted",
            method, tx_hash
        )));
    }

    Ok(ConfirmedTx {
        tx_hash,
        block_number: receipt.block_number,
    })
}
