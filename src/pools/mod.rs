/*
 * Routable pool abstraction over concentrated-liquidity and constant-product pools
 */

pub mod concentrated;
pub mod constant_product;
pub mod raw;

use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigInt;

use crate::math::decimal::Dec;
use crate::models::{Coin, Result, SwapResult};
use crate::ticks::TickDataProvider;
use crate::utils::calculate_price_impact;

pub use concentrated::{ConcentratedPool, ConcentratedPoolState};
pub use constant_product::ConstantProductPool;
pub use raw::{RawConcentratedPool, RawConstantProductPool, RawPool};

/// Everything the router needs from a pool. Pools are read-only snapshots.
#[async_trait]
pub trait RoutablePool: Send + Sync {
    fn id(&self) -> &str;

    fn pool_asset_denoms(&self) -> Vec<String>;

    fn has_pool_asset(&self, denom: &str) -> bool {
        self.pool_asset_denoms().iter().any(|d| d == denom)
    }

    fn swap_fee(&self) -> &Dec;

    fn spot_price_in_over_out_without_fee(
        &self,
        token_in_denom: &str,
        token_out_denom: &str,
    ) -> Result<Dec>;

    fn spot_price_in_over_out(&self, token_in_denom: &str, token_out_denom: &str) -> Result<Dec> {
        let without_fee = self.spot_price_in_over_out_without_fee(token_in_denom, token_out_denom)?;
        price_with_fee(&without_fee, self.swap_fee())
    }

    fn spot_price_out_over_in_without_fee(
        &self,
        token_in_denom: &str,
        token_out_denom: &str,
    ) -> Result<Dec> {
        let in_over_out = self.spot_price_in_over_out_without_fee(token_in_denom, token_out_denom)?;
        Ok(Dec::one().quo_round(&in_over_out)?)
    }

    fn spot_price_out_over_in(&self, token_in_denom: &str, token_out_denom: &str) -> Result<Dec> {
        let in_over_out = self.spot_price_in_over_out(token_in_denom, token_out_denom)?;
        Ok(Dec::one().quo_round(&in_over_out)?)
    }

    /// Liquidity figure comparable across pool types, used to weight routes.
    fn normalized_liquidity(&self) -> Dec;

    /// Largest input the pool is expected to absorb for `token_in_denom`,
    /// or `None` when the pool does not know its reserves.
    fn get_limit_amount_by_token_in(&self, token_in_denom: &str) -> Result<Option<BigInt>>;

    /// Quotes selling `token_in`. `swap_fee` overrides the pool's own fee.
    async fn get_token_out_by_token_in(
        &self,
        token_in: &Coin,
        token_out_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult>;

    /// Quotes buying `token_out`; the result amount is the required input.
    async fn get_token_in_by_token_out(
        &self,
        token_out: &Coin,
        token_in_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult>;
}

#[derive(Clone)]
pub enum Pool {
    ConstantProduct(ConstantProductPool),
    Concentrated(ConcentratedPool),
}

impl Pool {
    /// Parses a raw snapshot; concentrated pools read ticks from `tick_provider`.
    pub fn from_raw(raw: RawPool, tick_provider: Arc<dyn TickDataProvider>) -> Result<Self> {
        match raw {
            RawPool::Concentrated(raw) => {
                Ok(Pool::Concentrated(raw.into_pool(tick_provider)?))
            }
            RawPool::ConstantProduct(raw) => Ok(Pool::ConstantProduct(raw.into_pool()?)),
        }
    }

    fn inner(&self) -> &dyn RoutablePool {
        match self {
            Pool::ConstantProduct(pool) => pool,
            Pool::Concentrated(pool) => pool,
        }
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pool::ConstantProduct(pool) => f.debug_tuple("ConstantProduct").field(pool).finish(),
            Pool::Concentrated(pool) => f.debug_tuple("Concentrated").field(pool).finish(),
        }
    }
}

#[async_trait]
impl RoutablePool for Pool {
    fn id(&self) -> &str {
        self.inner().id()
    }

    fn pool_asset_denoms(&self) -> Vec<String> {
        self.inner().pool_asset_denoms()
    }

    fn has_pool_asset(&self, denom: &str) -> bool {
        self.inner().has_pool_asset(denom)
    }

    fn swap_fee(&self) -> &Dec {
        self.inner().swap_fee()
    }

    fn spot_price_in_over_out_without_fee(
        &self,
        token_in_denom: &str,
        token_out_denom: &str,
    ) -> Result<Dec> {
        self.inner()
            .spot_price_in_over_out_without_fee(token_in_denom, token_out_denom)
    }

    fn normalized_liquidity(&self) -> Dec {
        self.inner().normalized_liquidity()
    }

    fn get_limit_amount_by_token_in(&self, token_in_denom: &str) -> Result<Option<BigInt>> {
        self.inner().get_limit_amount_by_token_in(token_in_denom)
    }

    async fn get_token_out_by_token_in(
        &self,
        token_in: &Coin,
        token_out_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult> {
        self.inner()
            .get_token_out_by_token_in(token_in, token_out_denom, swap_fee)
            .await
    }

    async fn get_token_in_by_token_out(
        &self,
        token_out: &Coin,
        token_in_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult> {
        self.inner()
            .get_token_in_by_token_out(token_out, token_in_denom, swap_fee)
            .await
    }
}

/// Spot prices of a swap in the input/output orientation, fee included.
pub(crate) struct SwapPrices {
    pub before_in_over_out: Dec,
    pub after_in_over_out: Dec,
}

/// Assembles a [`SwapResult`] from the integer amounts that changed hands.
pub(crate) fn build_swap_result(
    amount: BigInt,
    amount_in: &BigInt,
    amount_out: &BigInt,
    prices: SwapPrices,
    num_ticks_crossed: usize,
) -> Result<SwapResult> {
    let amount_in = Dec::from(amount_in);
    let amount_out = Dec::from(amount_out);
    let effective_price_in_over_out = amount_in.quo_round(&amount_out)?;
    let effective_price_out_over_in = amount_out.quo_round(&amount_in)?;
    let price_impact_token_out =
        calculate_price_impact(&effective_price_in_over_out, &prices.before_in_over_out)?;

    Ok(SwapResult {
        amount,
        before_spot_price_out_over_in: invert(&prices.before_in_over_out)?,
        after_spot_price_out_over_in: invert(&prices.after_in_over_out)?,
        before_spot_price_in_over_out: prices.before_in_over_out,
        after_spot_price_in_over_out: prices.after_in_over_out,
        effective_price_in_over_out,
        effective_price_out_over_in,
        price_impact_token_out,
        num_ticks_crossed,
    })
}

/// Grosses a fee-less price up by the swap fee.
pub(crate) fn price_with_fee(price_without_fee: &Dec, swap_fee: &Dec) -> Result<Dec> {
    Ok(price_without_fee.quo_round(&(Dec::one() - swap_fee))?)
}

fn invert(price: &Dec) -> Result<Dec> {
    if price.is_zero() {
        return Ok(Dec::zero());
    }
    Ok(Dec::one().quo_round(price)?)
}
