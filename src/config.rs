//! Environment configuration
//!
//! Loaded once at startup (after `dotenvy::dotenv()`), shared by the server
//! and the `list_video` CLI.

use alloy::primitives::Address;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default per-request timeout for backend calls
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 15;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "{} must be set", name),
            ConfigError::Invalid { name, reason } => write!(f, "Invalid {}: {}", name, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub rpc_url: String,
    /// Hex private key of the seller wallet (0x prefix optional)
    pub private_key: String,
    /// Marketplace contract: price oracle, offer book and approval spender
    pub marketplace_address: Address,
    /// ERC-20 token the offer is priced in
    pub token_address: Address,
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub bind_addr: String,
    pub expected_chain_id: Option<u64>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("marketplace_address", &self.marketplace_address)
            .field("token_address", &self.token_address)
            .field("backend_url", &self.backend_url)
            .field("backend_timeout", &self.backend_timeout)
            .field("bind_addr", &self.bind_addr)
            .field("expected_chain_id", &self.expected_chain_id)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let parse_address = |name: &'static str| -> Result<Address, ConfigError> {
            let raw = required(name)?;
            Address::from_str(raw.trim()).map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        };

        let backend_timeout = match lookup("BACKEND_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: "BACKEND_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        name: "BACKEND_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
        };

        let expected_chain_id = lookup("EXPECTED_CHAIN_ID")
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: "EXPECTED_CHAIN_ID",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        Ok(Self {
            rpc_url: required("RPC_URL")?,
            private_key: required("PRIVATE_KEY")?,
            marketplace_address: parse_address("MARKETPLACE_ADDRESS")?,
            token_address: parse_address("TOKEN_ADDRESS")?,
            backend_url: required("BACKEND_URL")?.trim_end_matches('/').to_string(),
            backend_timeout,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            expected_chain_id,
        })
    }
}
