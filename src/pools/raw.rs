/*
 * Raw pool snapshots as delivered by indexers, with numeric fields as strings
 */

use std::str::FromStr;
use std::sync::Arc;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::math::decimal::Dec;
use crate::models::{Coin, Result, RouterError};
use crate::pools::concentrated::{ConcentratedPool, ConcentratedPoolState};
use crate::pools::constant_product::ConstantProductPool;
use crate::ticks::TickDataProvider;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawPool {
    Concentrated(RawConcentratedPool),
    ConstantProduct(RawConstantProductPool),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawConcentratedPool {
    pub id: String,
    pub token0: String,
    pub token1: String,
    pub current_tick: String,
    pub current_sqrt_price: String,
    pub current_tick_liquidity: String,
    pub tick_spacing: String,
    pub exponent_at_price_one: String,
    #[serde(alias = "spread_factor")]
    pub swap_fee: String,
    #[serde(default)]
    pub token0_amount: Option<String>,
    #[serde(default)]
    pub token1_amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawPoolAsset {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawConstantProductPool {
    pub id: String,
    pub pool_assets: Vec<RawPoolAsset>,
    pub swap_fee: String,
}

fn parse_field<T>(pool_id: &str, field: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| RouterError::PoolConfig {
        pool_id: pool_id.to_string(),
        reason: format!("invalid {field} {value:?}: {e}"),
    })
}

impl RawConcentratedPool {
    pub fn into_pool(self, tick_provider: Arc<dyn TickDataProvider>) -> Result<ConcentratedPool> {
        let id = self.id.as_str();
        let state = ConcentratedPoolState {
            current_tick: parse_field(id, "current_tick", &self.current_tick)?,
            current_sqrt_price: parse_field::<Dec>(id, "current_sqrt_price", &self.current_sqrt_price)?,
            current_tick_liquidity: parse_field::<Dec>(
                id,
                "current_tick_liquidity",
                &self.current_tick_liquidity,
            )?,
            tick_spacing: parse_field(id, "tick_spacing", &self.tick_spacing)?,
            exponent_at_price_one: parse_field(id, "exponent_at_price_one", &self.exponent_at_price_one)?,
            swap_fee: parse_field::<Dec>(id, "swap_fee", &self.swap_fee)?,
            token0_amount: parse_optional_amount(id, "token0_amount", self.token0_amount.as_deref())?,
            token1_amount: parse_optional_amount(id, "token1_amount", self.token1_amount.as_deref())?,
            id: self.id.clone(),
            token0: self.token0,
            token1: self.token1,
        };
        ConcentratedPool::new(state, tick_provider)
    }
}

fn parse_optional_amount(pool_id: &str, field: &str, value: Option<&str>) -> Result<Option<BigInt>> {
    value.map(|value| parse_field(pool_id, field, value)).transpose()
}

impl RawConstantProductPool {
    pub fn into_pool(self) -> Result<ConstantProductPool> {
        let id = self.id.as_str();
        let [first, second] = <[RawPoolAsset; 2]>::try_from(self.pool_assets).map_err(
            |assets| RouterError::PoolConfig {
                pool_id: id.to_string(),
                reason: format!("expected 2 pool assets, got {}", assets.len()),
            },
        )?;
        let reserves = [
            Coin::new(first.denom, parse_field::<BigInt>(id, "amount", &first.amount)?),
            Coin::new(second.denom, parse_field::<BigInt>(id, "amount", &second.amount)?),
        ];
        let swap_fee = parse_field::<Dec>(id, "swap_fee", &self.swap_fee)?;
        ConstantProductPool::new(self.id.clone(), reserves, swap_fee)
    }
}
