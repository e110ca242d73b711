//! Price Converter
//!
//! Turns a fiat price into a token amount using the on-chain oracle rate.
//! All arithmetic is done in `Decimal`; the oracle answer is an integer
//! scaled by 10^8 and both the rate and the resulting amount are rounded to
//! 8 significant digits before anything is sent on chain.

use alloy::primitives::U256;
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, error};

use crate::error::{ChainError, ListingError};

/// Decimal scale of the oracle answer
pub const ORACLE_SCALE: u32 = 8;

/// Significant digits kept for the rate and the token amount
pub const SIGNIFICANT_DIGITS: u32 = 8;

/// Decimals of the ERC-20 the offer is priced in
pub const TOKEN_DECIMALS: u32 = 18;

/// Read-only price feed returning fiat-per-token scaled by 10^8
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn latest_price(&self) -> Result<i128, ChainError>;
}

/// Amount of tokens in both human and base-unit form
#[derive(Debug, Clone, PartialEq)]
pub struct TokenAmount {
    pub value: Decimal,
    pub base_units: U256,
}

impl TokenAmount {
    /// Base units as a decimal integer string, the form used on chain
    pub fn base_units_string(&self) -> String {
        self.base_units.to_string()
    }
}

/// Result of one conversion
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub fiat_price: Decimal,
    pub exchange_rate: Decimal,
    pub token_amount: TokenAmount,
}

/// Fetch a fresh oracle rate and convert `fiat_price` into a token amount.
///
/// The rate is never cached; each call performs one oracle read.
pub async fn compute_token_amount(
    oracle: &dyn PriceOracle,
    fiat_price: Decimal,
) -> Result<PriceQuote, ListingError> {
    if fiat_price <= Decimal::ZERO {
        return Err(ListingError::InvalidRequest(format!(
            "fiat price must be positive, got {}",
            fiat_price
        )));
    }

    let raw = oracle.latest_price().await.map_err(|e| {
        error!(error = %e, "Oracle read failed");
        ListingError::OracleUnavailable(e.to_string())
    })?;

    let exchange_rate = exchange_rate_from_oracle(raw)?;
    let token_amount = token_amount_for(fiat_price, exchange_rate)?;

    debug!(
        fiat_price = %fiat_price,
        oracle_raw = raw,
        exchange_rate = %exchange_rate,
        token_amount = %token_amount.value,
        base_units = %token_amount.base_units,
        "Converted fiat price to token amount"
    );

    Ok(PriceQuote {
        fiat_price,
        exchange_rate,
        token_amount,
    })
}

/// Scale a raw oracle answer down by 10^8 and round to 8 significant digits
pub fn exchange_rate_from_oracle(raw: i128) -> Result<Decimal, ListingError> {
    if raw <= 0 {
        return Err(ListingError::OracleUnavailable(format!(
            "oracle returned non-positive price {}",
            raw
        )));
    }

    let rate = Decimal::try_from_i128_with_scale(raw, ORACLE_SCALE).map_err(|e| {
        ListingError::OracleUnavailable(format!("oracle price {} out of range: {}", raw, e))
    })?;

    round_significant(rate).ok_or_else(|| {
        ListingError::OracleUnavailable(format!("oracle price {} cannot be rounded", raw))
    })
}

/// `fiat_price / rate`, rounded to 8 significant digits
pub fn token_amount_for(fiat_price: Decimal, rate: Decimal) -> Result<TokenAmount, ListingError> {
    if rate <= Decimal::ZERO {
        return Err(ListingError::OracleUnavailable(format!(
            "exchange rate must be positive, got {}",
            rate
        )));
    }

    let value = fiat_price
        .checked_div(rate)
        .and_then(round_significant)
        .ok_or_else(|| {
            ListingError::InvalidRequest(format!(
                "fiat price {} cannot be converted at rate {}",
                fiat_price, rate
            ))
        })?;

    let base_units = to_base_units(value)?;

    Ok(TokenAmount { value, base_units })
}

/// Convert a positive token amount into 18-decimal base units.
///
/// Digits beyond the 18th decimal place are truncated.
pub fn to_base_units(amount: Decimal) -> Result<U256, ListingError> {
    if amount <= Decimal::ZERO {
        return Err(ListingError::InvalidRequest(format!(
            "token amount must be positive, got {}",
            amount
        )));
    }

    let amount = amount.normalize();
    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();
    let ten = U256::from(10u8);

    let base_units = if scale <= TOKEN_DECIMALS {
        mantissa * ten.pow(U256::from(TOKEN_DECIMALS - scale))
    } else {
        mantissa / ten.pow(U256::from(scale - TOKEN_DECIMALS))
    };

    if base_units.is_zero() {
        return Err(ListingError::InvalidRequest(format!(
            "token amount {} is below one base unit",
            amount
        )));
    }

    Ok(base_units)
}

fn round_significant(value: Decimal) -> Option<Decimal> {
    value.round_sf_with_strategy(SIGNIFICANT_DIGITS, RoundingStrategy::MidpointAwayFromZero)
}
