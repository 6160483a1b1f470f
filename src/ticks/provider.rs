/*
 * Tick data provider that widens its fetch range on demand
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::math::tick::{estimate_initial_tick_bound, min_max_ticks};
use crate::metrics::RouterMetrics;
use crate::models::{Coin, Result, RouterError};
use crate::pools::concentrated::ConcentratedPool;
use crate::pools::RoutablePool;
use crate::ticks::{TickDataProvider, TickDepthSource, TickDepths};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FetchKey {
    pool_id: String,
    token_in_denom: String,
}

#[derive(Debug)]
struct FetchState {
    start_tick: i64,
    distance: i64,
    widenings: u32,
    depths: TickDepths,
}

/// Fetches ticks from a [`TickDepthSource`] in growing ranges.
///
/// The first request for a pool and direction is sized by the estimated
/// price movement of the swap. Every retry multiplies the fetched tick
/// distance by the ramp factor, up to `max_retries` widenings per key.
pub struct IncrementalTickDataProvider<S> {
    source: S,
    ramp_multiplier: i64,
    max_retries: u32,
    fetches: Mutex<HashMap<FetchKey, Arc<Mutex<Option<FetchState>>>>>,
    metrics: Option<RouterMetrics>,
}

impl<S: TickDepthSource> IncrementalTickDataProvider<S> {
    pub fn new(source: S) -> Self {
        Self::from_config(source, &RouterConfig::default())
    }

    pub fn from_config(source: S, config: &RouterConfig) -> Self {
        Self {
            source,
            ramp_multiplier: config.tick_ramp_multiplier,
            max_retries: config.max_tick_retries,
            fetches: Mutex::new(HashMap::new()),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: RouterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Forgets all fetched ranges and retry counters.
    pub async fn clear(&self) {
        self.fetches.lock().await.clear();
    }

    async fn entry(&self, key: FetchKey) -> Arc<Mutex<Option<FetchState>>> {
        let mut fetches = self.fetches.lock().await;
        fetches.entry(key).or_default().clone()
    }

    async fn tick_depths(
        &self,
        pool: &ConcentratedPool,
        token_in_denom: &str,
        estimated_bound: i64,
        attempt: u32,
    ) -> Result<TickDepths> {
        let current_tick = pool.current_tick();
        let (min_tick, max_tick) = min_max_ticks(pool.exponent_at_price_one())?;
        let required = (estimated_bound - current_tick)
            .abs()
            .max(pool.tick_spacing() as i64)
            .max(1);

        let entry = self
            .entry(FetchKey {
                pool_id: pool.id().to_string(),
                token_in_denom: token_in_denom.to_string(),
            })
            .await;
        // concurrent quotes for the same key wait here for one fetch
        let mut guard = entry.lock().await;
        if guard.as_ref().is_some_and(|s| s.start_tick != current_tick) {
            *guard = None;
        }

        let (distance, widenings) = match guard.as_ref() {
            Some(state) if attempt > 0 => {
                if attempt <= state.widenings || state.depths.is_max_ticks {
                    return Ok(state.depths.clone());
                }
                if state.widenings >= self.max_retries {
                    warn!(
                        pool_id = pool.id(),
                        token_in = token_in_denom,
                        retries = state.widenings,
                        "Tick fetch retry limit reached"
                    );
                    return Err(RouterError::TickFetchLimitExceeded {
                        pool_id: pool.id().to_string(),
                        retries: state.widenings,
                    });
                }
                (
                    state.distance.saturating_mul(self.ramp_multiplier),
                    state.widenings + 1,
                )
            }
            Some(state) if state.distance >= required => return Ok(state.depths.clone()),
            Some(state) => (required, state.widenings),
            None => (required, 0),
        };

        let zero_for_one = token_in_denom == pool.token0();
        let bound_tick = if zero_for_one {
            current_tick.saturating_sub(distance).max(min_tick)
        } else {
            current_tick.saturating_add(distance).min(max_tick)
        };

        let mut depths = self
            .source
            .liquidity_net_in_direction(pool.id(), token_in_denom, current_tick, bound_tick)
            .await?;
        if let Some(metrics) = &self.metrics {
            metrics.tick_fetches.inc();
        }
        if bound_tick == min_tick || bound_tick == max_tick {
            depths.is_max_ticks = true;
        }
        debug!(
            pool_id = pool.id(),
            token_in = token_in_denom,
            bound_tick,
            ticks = depths.all_ticks.len(),
            is_max_ticks = depths.is_max_ticks,
            "Fetched tick depths"
        );

        *guard = Some(FetchState {
            start_tick: current_tick,
            distance,
            widenings,
            depths: depths.clone(),
        });
        Ok(depths)
    }
}

#[async_trait]
impl<S: TickDepthSource> TickDataProvider for IncrementalTickDataProvider<S> {
    async fn get_tick_depths_token_out_given_in(
        &self,
        pool: &ConcentratedPool,
        token_in: &Coin,
        attempt: u32,
    ) -> Result<TickDepths> {
        let estimated_bound = estimate_initial_tick_bound(
            token_in,
            true,
            pool.token0(),
            pool.current_sqrt_price(),
            pool.current_tick_liquidity(),
            pool.exponent_at_price_one(),
        )?;
        self.tick_depths(pool, &token_in.denom, estimated_bound, attempt)
            .await
    }

    async fn get_tick_depths_token_in_given_out(
        &self,
        pool: &ConcentratedPool,
        token_out: &Coin,
        attempt: u32,
    ) -> Result<TickDepths> {
        let token_in_denom = if token_out.denom == pool.token0() {
            pool.token1()
        } else {
            pool.token0()
        };
        let estimated_bound = estimate_initial_tick_bound(
            token_out,
            false,
            pool.token0(),
            pool.current_sqrt_price(),
            pool.current_tick_liquidity(),
            pool.exponent_at_price_one(),
        )?;
        self.tick_depths(pool, token_in_denom, estimated_bound, attempt)
            .await
    }
}
