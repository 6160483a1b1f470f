/*
 * Tick liquidity data consumed by concentrated-liquidity pools
 */

pub mod memory;
pub mod provider;

use async_trait::async_trait;

use crate::models::{Coin, Result, TickDepth};
use crate::pools::concentrated::ConcentratedPool;

pub use memory::InMemoryTickSource;
pub use provider::IncrementalTickDataProvider;

/// Initialized ticks in swap order, plus whether no further ticks exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickDepths {
    pub all_ticks: Vec<TickDepth>,
    pub is_max_ticks: bool,
}

/// Supplies the tick data a pool needs to simulate a swap.
///
/// `attempt` is zero on the first request for a quote and increases each
/// time the caller ran out of ticks with the previous answer, which asks the
/// provider for a wider range.
#[async_trait]
pub trait TickDataProvider: Send + Sync {
    async fn get_tick_depths_token_out_given_in(
        &self,
        pool: &ConcentratedPool,
        token_in: &Coin,
        attempt: u32,
    ) -> Result<TickDepths>;

    async fn get_tick_depths_token_in_given_out(
        &self,
        pool: &ConcentratedPool,
        token_out: &Coin,
        attempt: u32,
    ) -> Result<TickDepths>;
}

/// Fetches net liquidity per initialized tick between `start_tick` and
/// `bound_tick`, ordered from the start towards the bound. A bound below the
/// start walks down (token0 in), above walks up (token1 in).
///
/// `is_max_ticks` in the answer reports that no initialized tick lies beyond
/// the bound.
#[async_trait]
pub trait TickDepthSource: Send + Sync {
    async fn liquidity_net_in_direction(
        &self,
        pool_id: &str,
        token_in_denom: &str,
        start_tick: i64,
        bound_tick: i64,
    ) -> Result<TickDepths>;
}
