/*
 * Fixed tick data held in memory
 */

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Result, RouterError, TickDepth};
use crate::ticks::{TickDepthSource, TickDepths};

/// Serves a static set of initialized ticks per pool.
#[derive(Debug, Default)]
pub struct InMemoryTickSource {
    pools: RwLock<HashMap<String, Vec<TickDepth>>>,
}

impl InMemoryTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the ticks of `pool_id`; order does not matter.
    pub async fn insert_pool(&self, pool_id: impl Into<String>, mut ticks: Vec<TickDepth>) {
        ticks.sort_by_key(|t| t.tick_index);
        self.pools.write().await.insert(pool_id.into(), ticks);
    }

    pub fn with_pool(pool_id: impl Into<String>, mut ticks: Vec<TickDepth>) -> Self {
        ticks.sort_by_key(|t| t.tick_index);
        let mut pools = HashMap::new();
        pools.insert(pool_id.into(), ticks);
        Self {
            pools: RwLock::new(pools),
        }
    }
}

#[async_trait]
impl TickDepthSource for InMemoryTickSource {
    async fn liquidity_net_in_direction(
        &self,
        pool_id: &str,
        _token_in_denom: &str,
        start_tick: i64,
        bound_tick: i64,
    ) -> Result<TickDepths> {
        let pools = self.pools.read().await;
        let ticks = pools
            .get(pool_id)
            .ok_or_else(|| RouterError::TickSource(format!("Unknown pool {pool_id}")))?;

        // the tick the price sits on is already active when walking up
        let (all_ticks, is_max_ticks) = if bound_tick < start_tick {
            let all_ticks = ticks
                .iter()
                .rev()
                .filter(|t| t.tick_index <= start_tick && t.tick_index >= bound_tick)
                .cloned()
                .collect();
            (all_ticks, ticks.iter().all(|t| t.tick_index >= bound_tick))
        } else {
            let all_ticks = ticks
                .iter()
                .filter(|t| t.tick_index > start_tick && t.tick_index <= bound_tick)
                .cloned()
                .collect();
            (all_ticks, ticks.iter().all(|t| t.tick_index <= bound_tick))
        };
        Ok(TickDepths {
            all_ticks,
            is_max_ticks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::decimal::Dec;

    fn source() -> InMemoryTickSource {
        InMemoryTickSource::with_pool(
            "1",
            vec![
                TickDepth::new(300, Dec::from(-5i64)),
                TickDepth::new(-100, Dec::from(5i64)),
                TickDepth::new(0, Dec::from(2i64)),
                TickDepth::new(200, Dec::from(-2i64)),
            ],
        )
    }

    #[tokio::test]
    async fn walks_down_from_the_current_tick() {
        let depths = source()
            .liquidity_net_in_direction("1", "eth", 0, -1_000)
            .await
            .unwrap();
        let indexes: Vec<_> = depths.all_ticks.iter().map(|t| t.tick_index).collect();
        assert_eq!(indexes, vec![0, -100]);
        assert!(depths.is_max_ticks);
    }

    #[tokio::test]
    async fn walks_up_to_the_bound() {
        let depths = source()
            .liquidity_net_in_direction("1", "usdc", 0, 250)
            .await
            .unwrap();
        let indexes: Vec<_> = depths.all_ticks.iter().map(|t| t.tick_index).collect();
        assert_eq!(indexes, vec![200]);
        // tick 300 is still ahead
        assert!(!depths.is_max_ticks);
    }

    #[tokio::test]
    async fn unknown_pool_is_an_error() {
        let err = source()
            .liquidity_net_in_direction("2", "usdc", 0, 250)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::TickSource(_)));
    }
}
