/*
 * Concentrated-liquidity pool quoting over incrementally fetched tick data
 */

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::Signed;
use tracing::debug;

use crate::math::decimal::Dec;
use crate::math::quotes::{calc_in_given_out, calc_out_given_in, PoolSwapState, SimulatedSwap};
use crate::math::tick::{
    max_spot_price, min_spot_price, EXPONENT_AT_PRICE_ONE_MAX, EXPONENT_AT_PRICE_ONE_MIN,
};
use crate::models::{Coin, Result, RouterError, SwapResult};
use crate::pools::{build_swap_result, price_with_fee, RoutablePool, SwapPrices};
use crate::ticks::{TickDataProvider, TickDepths};
use crate::utils::validate_denoms;

/// Typed on-chain state of a concentrated-liquidity pool.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentratedPoolState {
    pub id: String,
    pub token0: String,
    pub token1: String,
    pub current_tick: i64,
    pub current_sqrt_price: Dec,
    pub current_tick_liquidity: Dec,
    pub tick_spacing: u64,
    pub exponent_at_price_one: i64,
    pub swap_fee: Dec,
    /// Pool reserves, when the snapshot carries them.
    pub token0_amount: Option<BigInt>,
    pub token1_amount: Option<BigInt>,
}

#[derive(Clone)]
pub struct ConcentratedPool {
    state: ConcentratedPoolState,
    tick_provider: Arc<dyn TickDataProvider>,
}

impl std::fmt::Debug for ConcentratedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcentratedPool")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ConcentratedPool {
    pub fn new(state: ConcentratedPoolState, tick_provider: Arc<dyn TickDataProvider>) -> Result<Self> {
        if state.token0 == state.token1 {
            return Err(RouterError::PoolConfig {
                pool_id: state.id,
                reason: "token0 and token1 must differ".to_string(),
            });
        }
        if !(EXPONENT_AT_PRICE_ONE_MIN..=EXPONENT_AT_PRICE_ONE_MAX)
            .contains(&state.exponent_at_price_one)
        {
            return Err(RouterError::Range(format!(
                "exponent at price one {} outside [{EXPONENT_AT_PRICE_ONE_MIN}, {EXPONENT_AT_PRICE_ONE_MAX}]",
                state.exponent_at_price_one
            )));
        }
        if state.swap_fee.is_negative() || state.swap_fee >= Dec::one() {
            return Err(RouterError::Range(format!(
                "swap fee {} outside [0, 1)",
                state.swap_fee
            )));
        }
        if state.current_tick_liquidity.is_negative() {
            return Err(RouterError::InvariantViolation(format!(
                "pool {} has negative liquidity {}",
                state.id, state.current_tick_liquidity
            )));
        }

        let price = state.current_sqrt_price.mul_round(&state.current_sqrt_price);
        if price < min_spot_price() || price > max_spot_price() {
            return Err(RouterError::Range(format!(
                "pool {} spot price {price} outside global bounds",
                state.id
            )));
        }

        Ok(Self {
            state,
            tick_provider,
        })
    }

    #[must_use]
    pub fn state(&self) -> &ConcentratedPoolState {
        &self.state
    }

    #[must_use]
    pub fn token0(&self) -> &str {
        &self.state.token0
    }

    #[must_use]
    pub fn token1(&self) -> &str {
        &self.state.token1
    }

    #[must_use]
    pub fn current_tick(&self) -> i64 {
        self.state.current_tick
    }

    #[must_use]
    pub fn current_sqrt_price(&self) -> &Dec {
        &self.state.current_sqrt_price
    }

    #[must_use]
    pub fn current_tick_liquidity(&self) -> &Dec {
        &self.state.current_tick_liquidity
    }

    #[must_use]
    pub fn tick_spacing(&self) -> u64 {
        self.state.tick_spacing
    }

    #[must_use]
    pub fn exponent_at_price_one(&self) -> i64 {
        self.state.exponent_at_price_one
    }

    /// token1 per token0.
    #[must_use]
    pub fn spot_price(&self) -> Dec {
        self.state.current_sqrt_price.mul_round(&self.state.current_sqrt_price)
    }

    fn swap_state<'a>(&'a self, swap_fee: &'a Dec) -> PoolSwapState<'a> {
        PoolSwapState {
            token0_denom: &self.state.token0,
            current_sqrt_price: &self.state.current_sqrt_price,
            current_tick: self.state.current_tick,
            current_liquidity: &self.state.current_tick_liquidity,
            exponent_at_price_one: self.state.exponent_at_price_one,
            swap_fee,
        }
    }

    /// In-over-out price without fee at `sqrt_price`.
    fn price_in_over_out_at(&self, sqrt_price: &Dec, token_in_denom: &str) -> Result<Dec> {
        let price = sqrt_price.mul_round(sqrt_price);
        if token_in_denom == self.state.token1 {
            Ok(price)
        } else {
            Ok(Dec::one().quo_round(&price)?)
        }
    }

    fn swap_prices(
        &self,
        token_in_denom: &str,
        swap_fee: &Dec,
        swap: &SimulatedSwap,
    ) -> Result<SwapPrices> {
        let before = self.price_in_over_out_at(&self.state.current_sqrt_price, token_in_denom)?;
        let after = self.price_in_over_out_at(&swap.after_sqrt_price, token_in_denom)?;
        Ok(SwapPrices {
            before_in_over_out: price_with_fee(&before, swap_fee)?,
            after_in_over_out: price_with_fee(&after, swap_fee)?,
        })
    }

    /// Runs `simulate` against growing tick ranges until it stops overflowing.
    async fn simulate_with_retries<F, Fut, S>(&self, fetch: F, simulate: S) -> Result<SimulatedSwap>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<TickDepths>>,
        S: Fn(&TickDepths) -> Result<SimulatedSwap>,
    {
        let mut attempt = 0;
        loop {
            let depths = fetch(attempt).await?;
            match simulate(&depths) {
                Err(RouterError::TickOverflow) if depths.is_max_ticks => {
                    return Err(RouterError::NotEnoughLiquidity);
                }
                Err(RouterError::TickOverflow) => {
                    debug!(
                        pool_id = %self.state.id,
                        attempt,
                        ticks = depths.all_ticks.len(),
                        "Ran out of ticks, requesting more"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

fn ensure_positive(coin: &Coin) -> Result<()> {
    if !coin.amount.is_positive() {
        return Err(RouterError::InvalidAmount(format!(
            "{} {} must be positive",
            coin.amount, coin.denom
        )));
    }
    Ok(())
}

#[async_trait]
impl RoutablePool for ConcentratedPool {
    fn id(&self) -> &str {
        &self.state.id
    }

    fn pool_asset_denoms(&self) -> Vec<String> {
        vec![self.state.token0.clone(), self.state.token1.clone()]
    }

    fn has_pool_asset(&self, denom: &str) -> bool {
        self.state.token0 == denom || self.state.token1 == denom
    }

    fn swap_fee(&self) -> &Dec {
        &self.state.swap_fee
    }

    fn spot_price_in_over_out_without_fee(
        &self,
        token_in_denom: &str,
        token_out_denom: &str,
    ) -> Result<Dec> {
        validate_denoms(
            &self.state.id,
            &self.pool_asset_denoms(),
            token_in_denom,
            token_out_denom,
        )?;
        self.price_in_over_out_at(&self.state.current_sqrt_price, token_in_denom)
    }

    fn normalized_liquidity(&self) -> Dec {
        self.state.current_tick_liquidity.clone()
    }

    fn get_limit_amount_by_token_in(&self, token_in_denom: &str) -> Result<Option<BigInt>> {
        if token_in_denom == self.state.token0 {
            Ok(self.state.token0_amount.clone())
        } else if token_in_denom == self.state.token1 {
            Ok(self.state.token1_amount.clone())
        } else {
            Err(RouterError::InvalidDenoms {
                pool_id: self.state.id.clone(),
                token_in: token_in_denom.to_string(),
                token_out: String::new(),
            })
        }
    }

    async fn get_token_out_by_token_in(
        &self,
        token_in: &Coin,
        token_out_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult> {
        validate_denoms(
            &self.state.id,
            &self.pool_asset_denoms(),
            &token_in.denom,
            token_out_denom,
        )?;
        ensure_positive(token_in)?;
        let swap_fee = swap_fee.unwrap_or(&self.state.swap_fee);

        let swap = self
            .simulate_with_retries(
                |attempt| {
                    self.tick_provider
                        .get_tick_depths_token_out_given_in(self, token_in, attempt)
                },
                |depths| {
                    calc_out_given_in(token_in, &self.swap_state(swap_fee), &depths.all_ticks, None)
                },
            )
            .await?;

        if !swap.amount.is_positive() {
            return Ok(SwapResult::zero());
        }

        let prices = self.swap_prices(&token_in.denom, swap_fee, &swap)?;
        build_swap_result(
            swap.amount.clone(),
            &token_in.amount,
            &swap.amount,
            prices,
            swap.num_ticks_crossed,
        )
    }

    async fn get_token_in_by_token_out(
        &self,
        token_out: &Coin,
        token_in_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult> {
        validate_denoms(
            &self.state.id,
            &self.pool_asset_denoms(),
            token_in_denom,
            &token_out.denom,
        )?;
        ensure_positive(token_out)?;
        let swap_fee = swap_fee.unwrap_or(&self.state.swap_fee);

        let swap = self
            .simulate_with_retries(
                |attempt| {
                    self.tick_provider
                        .get_tick_depths_token_in_given_out(self, token_out, attempt)
                },
                |depths| {
                    calc_in_given_out(token_out, &self.swap_state(swap_fee), &depths.all_ticks, None)
                },
            )
            .await?;

        if !swap.amount.is_positive() {
            return Ok(SwapResult::zero());
        }

        let prices = self.swap_prices(token_in_denom, swap_fee, &swap)?;
        build_swap_result(
            swap.amount.clone(),
            &swap.amount,
            &token_out.amount,
            prices,
            swap.num_ticks_crossed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TickDepth;
    use crate::ticks::{IncrementalTickDataProvider, InMemoryTickSource};

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn liquidity() -> Dec {
        dec("1517882343.751510418088349649")
    }

    fn state() -> ConcentratedPoolState {
        ConcentratedPoolState {
            id: "1".to_string(),
            token0: "eth".to_string(),
            token1: "usdc".to_string(),
            current_tick: 310_000,
            current_sqrt_price: dec("70.710678118654752440"),
            current_tick_liquidity: liquidity(),
            tick_spacing: 1_000,
            exponent_at_price_one: -4,
            swap_fee: Dec::zero(),
            token0_amount: Some(1_000_000.into()),
            token1_amount: Some(5_000_000_000u64.into()),
        }
    }

    fn pool_with_position() -> ConcentratedPool {
        let source = InMemoryTickSource::with_pool(
            "1",
            vec![
                TickDepth::new(305_450, liquidity()),
                TickDepth::new(315_000, -liquidity()),
            ],
        );
        ConcentratedPool::new(state(), Arc::new(IncrementalTickDataProvider::new(source))).unwrap()
    }

    #[tokio::test]
    async fn quotes_token1_in() {
        let pool = pool_with_position();
        let result = pool
            .get_token_out_by_token_in(&Coin::new("usdc", 42_000_000), "eth", None)
            .await
            .unwrap();

        assert_eq!(result.amount, BigInt::from(8396));
        assert_eq!(result.num_ticks_crossed, 0);
        assert_eq!(result.before_spot_price_in_over_out, pool.spot_price());
        assert!(result.after_spot_price_in_over_out > result.before_spot_price_in_over_out);
        assert!(result.price_impact_token_out.is_positive());
    }

    #[tokio::test]
    async fn quotes_token0_in() {
        let pool = pool_with_position();
        let result = pool
            .get_token_out_by_token_in(&Coin::new("eth", 13_370), "usdc", None)
            .await
            .unwrap();

        assert_eq!(result.amount, BigInt::from(66_808_388));
        assert!(result.after_spot_price_out_over_in < result.before_spot_price_out_over_in);
    }

    #[tokio::test]
    async fn quotes_in_given_out() {
        let pool = pool_with_position();
        let result = pool
            .get_token_in_by_token_out(&Coin::new("usdc", 66_808_388), "eth", None)
            .await
            .unwrap();
        assert_eq!(result.amount, BigInt::from(13_370));
    }

    #[tokio::test]
    async fn exhausting_all_ticks_is_not_enough_liquidity() {
        let pool = pool_with_position();
        let err = pool
            .get_token_out_by_token_in(&Coin::new("usdc", 5_300_000_000u64), "eth", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::NotEnoughLiquidity));
    }

    #[tokio::test]
    async fn tiny_input_yields_a_zero_result() {
        let pool = pool_with_position();
        let result = pool
            .get_token_out_by_token_in(&Coin::new("usdc", 1), "eth", None)
            .await
            .unwrap();
        assert_eq!(result, SwapResult::zero());
    }

    #[tokio::test]
    async fn rejects_foreign_denoms_and_empty_amounts() {
        let pool = pool_with_position();
        let err = pool
            .get_token_out_by_token_in(&Coin::new("atom", 10), "eth", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::InvalidDenoms { .. }));

        let err = pool
            .get_token_out_by_token_in(&Coin::new("usdc", 0), "eth", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::InvalidAmount(_)));
    }

    #[test]
    fn spot_prices_follow_orientation() {
        let pool = pool_with_position();
        let price = pool.spot_price();
        assert_eq!(
            pool.spot_price_in_over_out_without_fee("usdc", "eth").unwrap(),
            price
        );
        assert_eq!(
            pool.spot_price_out_over_in_without_fee("eth", "usdc").unwrap(),
            Dec::one().quo_round(&Dec::one().quo_round(&price).unwrap()).unwrap()
        );
        assert_eq!(
            pool.get_limit_amount_by_token_in("usdc").unwrap(),
            Some(BigInt::from(5_000_000_000u64))
        );
    }

    #[test]
    fn fee_raises_the_in_over_out_price() {
        let mut charged = state();
        charged.swap_fee = dec("0.002");
        let source = InMemoryTickSource::new();
        let pool =
            ConcentratedPool::new(charged, Arc::new(IncrementalTickDataProvider::new(source)))
                .unwrap();
        assert!(
            pool.spot_price_in_over_out("usdc", "eth").unwrap()
                > pool.spot_price_in_over_out_without_fee("usdc", "eth").unwrap()
        );
    }

    #[test]
    fn construction_rejects_out_of_range_state() {
        let provider: Arc<dyn TickDataProvider> =
            Arc::new(IncrementalTickDataProvider::new(InMemoryTickSource::new()));

        let mut bad_price = state();
        bad_price.current_sqrt_price = dec("0.0000001");
        assert!(matches!(
            ConcentratedPool::new(bad_price, provider.clone()),
            Err(RouterError::Range(_))
        ));

        let mut bad_exponent = state();
        bad_exponent.exponent_at_price_one = 0;
        assert!(ConcentratedPool::new(bad_exponent, provider).is_err());
    }
}
