/*
 * Two-asset constant-product pool
 */

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::Signed;

use crate::math::constant_product::{calc_in_given_out, calc_out_given_in, spot_price};
use crate::math::decimal::Dec;
use crate::models::{Coin, Result, RouterError, SwapResult};
use crate::pools::{build_swap_result, price_with_fee, RoutablePool, SwapPrices};
use crate::utils::validate_denoms;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantProductPool {
    id: String,
    reserves: [Coin; 2],
    swap_fee: Dec,
}

impl ConstantProductPool {
    pub fn new(id: impl Into<String>, reserves: [Coin; 2], swap_fee: Dec) -> Result<Self> {
        let id = id.into();
        if reserves[0].denom == reserves[1].denom {
            return Err(RouterError::PoolConfig {
                pool_id: id,
                reason: format!("duplicate asset {}", reserves[0].denom),
            });
        }
        if reserves.iter().any(|r| r.amount.is_negative()) {
            return Err(RouterError::PoolConfig {
                pool_id: id,
                reason: "reserves must not be negative".to_string(),
            });
        }
        if swap_fee.is_negative() || swap_fee >= Dec::one() {
            return Err(RouterError::Range(format!("swap fee {swap_fee} outside [0, 1)")));
        }
        Ok(Self {
            id,
            reserves,
            swap_fee,
        })
    }

    #[must_use]
    pub fn reserves(&self) -> &[Coin; 2] {
        &self.reserves
    }

    fn reserve(&self, denom: &str) -> Option<Dec> {
        self.reserves
            .iter()
            .find(|r| r.denom == denom)
            .map(|r| Dec::from(&r.amount))
    }

    /// Reserves ordered as (in, out), after checking both denoms.
    fn oriented_reserves(&self, token_in_denom: &str, token_out_denom: &str) -> Result<(Dec, Dec)> {
        validate_denoms(
            &self.id,
            &self.pool_asset_denoms(),
            token_in_denom,
            token_out_denom,
        )?;
        match (self.reserve(token_in_denom), self.reserve(token_out_denom)) {
            (Some(reserve_in), Some(reserve_out)) => Ok((reserve_in, reserve_out)),
            _ => Err(RouterError::InvalidDenoms {
                pool_id: self.id.clone(),
                token_in: token_in_denom.to_string(),
                token_out: token_out_denom.to_string(),
            }),
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
}

#[async_trait]
impl RoutablePool for ConstantProductPool {
    fn id(&self) -> &str {
        &self.id
    }

    fn pool_asset_denoms(&self) -> Vec<String> {
        self.reserves.iter().map(|r| r.denom.clone()).collect()
    }

    fn swap_fee(&self) -> &Dec {
        &self.swap_fee
    }

    fn spot_price_in_over_out_without_fee(
        &self,
        token_in_denom: &str,
        token_out_denom: &str,
    ) -> Result<Dec> {
        let (reserve_in, reserve_out) = self.oriented_reserves(token_in_denom, token_out_denom)?;
        spot_price(&reserve_in, &reserve_out)
    }

    /// Geometric mean of the reserves, the liquidity of an equivalent full-range position.
    fn normalized_liquidity(&self) -> Dec {
        let product = Dec::from(&self.reserves[0].amount).mul_truncate(&Dec::from(&self.reserves[1].amount));
        product.approx_sqrt()
    }

    fn get_limit_amount_by_token_in(&self, token_in_denom: &str) -> Result<Option<BigInt>> {
        self.reserves
            .iter()
            .find(|r| r.denom == token_in_denom)
            .map(|r| Some(r.amount.clone()))
            .ok_or_else(|| RouterError::InvalidDenoms {
                pool_id: self.id.clone(),
                token_in: token_in_denom.to_string(),
                token_out: String::new(),
            })
    }

    async fn get_token_out_by_token_in(
        &self,
        token_in: &Coin,
        token_out_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult> {
        let (reserve_in, reserve_out) = self.oriented_reserves(&token_in.denom, token_out_denom)?;
        Self::ensure_positive(token_in)?;
        let swap_fee = swap_fee.unwrap_or(&self.swap_fee);

        let amount_in = Dec::from(&token_in.amount);
        let amount_out = calc_out_given_in(&reserve_in, &reserve_out, &amount_in, swap_fee)?.truncate();
        if !amount_out.is_positive() {
            return Ok(SwapResult::zero());
        }

        let after_in = reserve_in.clone() + &amount_in;
        let after_out = reserve_out.clone() - &Dec::from(&amount_out);
        let prices = SwapPrices {
            before_in_over_out: price_with_fee(&spot_price(&reserve_in, &reserve_out)?, swap_fee)?,
            after_in_over_out: price_with_fee(&spot_price(&after_in, &after_out)?, swap_fee)?,
        };
        build_swap_result(amount_out.clone(), &token_in.amount, &amount_out, prices, 0)
    }

    async fn get_token_in_by_token_out(
        &self,
        token_out: &Coin,
        token_in_denom: &str,
        swap_fee: Option<&Dec>,
    ) -> Result<SwapResult> {
        let (reserve_in, reserve_out) = self.oriented_reserves(token_in_denom, &token_out.denom)?;
        Self::ensure_positive(token_out)?;
        let swap_fee = swap_fee.unwrap_or(&self.swap_fee);

        let amount_out = Dec::from(&token_out.amount);
        let amount_in = calc_in_given_out(&reserve_in, &reserve_out, &amount_out, swap_fee)?.round_up_int();

        let after_in = reserve_in.clone() + &Dec::from(&amount_in);
        let after_out = reserve_out.clone() - &amount_out;
        let prices = SwapPrices {
            before_in_over_out: price_with_fee(&spot_price(&reserve_in, &reserve_out)?, swap_fee)?,
            after_in_over_out: price_with_fee(&spot_price(&after_in, &after_out)?, swap_fee)?,
        };
        build_swap_result(amount_in.clone(), &amount_in, &token_out.amount, prices, 0)
    }
}
