/*
 * Shared data models and the error type for the routing engine
 */

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::decimal::{Dec, DecimalError};

/// A token amount tagged with its denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "crate::utils::bigint_string")]
    pub amount: BigInt,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: impl Into<BigInt>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.into(),
        }
    }
}

/// Liquidity entering or leaving the active range when the price crosses a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickDepth {
    pub tick_index: i64,
    pub net_liquidity: Dec,
}

impl TickDepth {
    pub fn new(tick_index: i64, net_liquidity: Dec) -> Self {
        Self {
            tick_index,
            net_liquidity,
        }
    }
}

/// Result of quoting a single pool for a fixed input (or output) amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapResult {
    #[serde(with = "crate::utils::bigint_string")]
    pub amount: BigInt,
    pub before_spot_price_in_over_out: Dec,
    pub before_spot_price_out_over_in: Dec,
    pub after_spot_price_in_over_out: Dec,
    pub after_spot_price_out_over_in: Dec,
    pub effective_price_in_over_out: Dec,
    pub effective_price_out_over_in: Dec,
    pub price_impact_token_out: Dec,
    pub num_ticks_crossed: usize,
}

impl SwapResult {
    /// The swap executes but yields nothing.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            amount: BigInt::from(0),
            before_spot_price_in_over_out: Dec::zero(),
            before_spot_price_out_over_in: Dec::zero(),
            after_spot_price_in_over_out: Dec::zero(),
            after_spot_price_out_over_in: Dec::zero(),
            effective_price_in_over_out: Dec::zero(),
            effective_price_out_over_in: Dec::zero(),
            price_impact_token_out: Dec::zero(),
            num_ticks_crossed: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Range error: {0}")]
    Range(String),

    #[error("Pool {pool_id} configuration error: {reason}")]
    PoolConfig { pool_id: String, reason: String },

    #[error("Ran out of tick data before the swap completed")]
    TickOverflow,

    #[error("Pool {pool_id} exceeded {retries} tick fetch retries")]
    TickFetchLimitExceeded { pool_id: String, retries: u32 },

    #[error("No route from {token_in} to {token_out}")]
    NoRoute { token_in: String, token_out: String },

    #[error("Not enough liquidity to fill the requested amount")]
    NotEnoughLiquidity,

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Pool {pool_id} cannot swap {token_in} for {token_out}")]
    InvalidDenoms {
        pool_id: String,
        token_in: String,
        token_out: String,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Decimal error: {0}")]
    Decimal(#[from] DecimalError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tick source error: {0}")]
    TickSource(String),
}

impl RouterError {
    /// Only running out of fetched ticks can be resolved by asking again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouterError::TickOverflow)
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_tick_overflow_is_retryable() {
        assert!(RouterError::TickOverflow.is_retryable());
        assert!(!RouterError::NotEnoughLiquidity.is_retryable());
        assert!(!RouterError::Range("tick".to_string()).is_retryable());
    }

    #[test]
    fn decimal_errors_convert() {
        let err: RouterError = DecimalError::DivisionByZero.into();
        assert_eq!(err.to_string(), "Decimal error: division by zero");
    }
}
