/*
 * Split router: route discovery, weighting, split search and quoting
 */

pub mod quote;
pub mod routes;
pub mod split;
pub mod weight;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::RouterConfig;
use crate::metrics::RouterMetrics;
use crate::models::{Coin, Result, RouterError};
use crate::pools::{Pool, RoutablePool};

pub use quote::{calculate_token_out_by_token_in, hop_swap_fees, SplitTokenInQuote};
pub use routes::{find_candidate_routes, Route, RouteWithInAmount};
pub use split::{find_best_split_token_in, RouteEvaluator};
pub use weight::{LiquidityWeigher, RouteWeigher};

type RouteKey = (String, String);
type OutputKey = (String, BigInt);

/// Finds and prices the best way to sell a token over a fixed pool set.
///
/// Candidate routes are cached per denom pair and route outputs per
/// `(route, amount)` until the pools or the incentivized set change.
pub struct OptimizedRoutes {
    pools: Vec<Arc<Pool>>,
    incentivized_pool_ids: HashSet<String>,
    config: RouterConfig,
    weigher: Arc<dyn RouteWeigher>,
    metrics: Option<RouterMetrics>,
    route_cache: Mutex<HashMap<RouteKey, Vec<Route>>>,
    output_cache: Mutex<HashMap<OutputKey, BigInt>>,
}

impl OptimizedRoutes {
    pub fn new(pools: Vec<Pool>, config: RouterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            pools: pools.into_iter().map(Arc::new).collect(),
            incentivized_pool_ids: HashSet::new(),
            config,
            weigher: Arc::new(LiquidityWeigher),
            metrics: None,
            route_cache: Mutex::new(HashMap::new()),
            output_cache: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn with_weigher(mut self, weigher: impl RouteWeigher + 'static) -> Self {
        self.weigher = Arc::new(weigher);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: RouterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn pools(&self) -> &[Arc<Pool>] {
        &self.pools
    }

    /// Replaces the pool snapshot. Cached routes and outputs are dropped.
    pub fn set_pools(&mut self, pools: Vec<Pool>) {
        self.pools = pools.into_iter().map(Arc::new).collect();
        self.route_cache.get_mut().clear();
        self.output_cache.get_mut().clear();
        info!(pools = self.pools.len(), "Router pools replaced");
    }

    /// Pools eligible for the numeraire fee discount.
    pub fn set_incentivized_pool_ids<I, S>(&mut self, pool_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incentivized_pool_ids = pool_ids.into_iter().map(Into::into).collect();
        self.output_cache.get_mut().clear();
    }

    /// Routes from `token_in_denom` to `token_out_denom`, shortest first.
    pub async fn get_candidate_routes(&self, token_in_denom: &str, token_out_denom: &str) -> Vec<Route> {
        let key = (token_in_denom.to_string(), token_out_denom.to_string());
        let mut cache = self.route_cache.lock().await;
        if let Some(routes) = cache.get(&key) {
            if let Some(metrics) = &self.metrics {
                metrics.route_cache_hits.inc();
            }
            return routes.clone();
        }
        if let Some(metrics) = &self.metrics {
            metrics.route_cache_misses.inc();
        }

        let routes = find_candidate_routes(
            &self.pools,
            token_in_denom,
            token_out_denom,
            self.config.max_hops,
            self.config.max_routes,
        );
        cache.insert(key, routes.clone());
        routes
    }

    /// Splits `token_in` over the best-weighted routes to `token_out_denom`.
    pub async fn get_optimized_routes_by_token_in(
        &self,
        token_in: &Coin,
        token_out_denom: &str,
    ) -> Result<Vec<RouteWithInAmount>> {
        if !token_in.amount.is_positive() {
            return Err(RouterError::InvalidAmount(format!(
                "{} {} must be positive",
                token_in.amount, token_in.denom
            )));
        }

        let mut routes = self.get_candidate_routes(&token_in.denom, token_out_denom).await;
        if routes.is_empty() {
            return Err(RouterError::NoRoute {
                token_in: token_in.denom.clone(),
                token_out: token_out_denom.to_string(),
            });
        }

        weight::sort_by_weight(&mut routes, self.weigher.as_ref());
        self.demote_shallow_direct_route(&mut routes, token_in)?;
        routes.truncate(self.config.max_split_routes);

        debug!(
            token_in = %token_in.denom,
            token_out = token_out_denom,
            amount = %token_in.amount,
            routes = %routes.iter().map(Route::identity).collect::<Vec<_>>().join(", "),
            "Searching best split"
        );

        find_best_split_token_in(self, &routes, token_in, self.config.max_split_iterations).await
    }

    /// Swaps a top-ranked single-pool route with the runner-up when its pool
    /// is known to be unable to absorb the whole input. Pools with no known
    /// limit keep their rank.
    fn demote_shallow_direct_route(&self, routes: &mut [Route], token_in: &Coin) -> Result<()> {
        if routes.len() < 2 || routes[0].hop_count() != 1 {
            return Ok(());
        }
        let Some(limit) = routes[0].pools()[0].get_limit_amount_by_token_in(&token_in.denom)? else {
            return Ok(());
        };
        if limit < token_in.amount {
            debug!(route = %routes[0], limit = %limit, "Demoting direct route");
            routes.swap(0, 1);
        }
        Ok(())
    }

    /// Simulates `routes` and aggregates them into one quote.
    pub async fn calculate_token_out_by_token_in(
        &self,
        routes: &[RouteWithInAmount],
    ) -> Result<SplitTokenInQuote> {
        calculate_token_out_by_token_in(
            routes,
            &self.config.numeraire_denom,
            &self.incentivized_pool_ids,
        )
        .await
    }
}

#[async_trait]
impl RouteEvaluator for OptimizedRoutes {
    async fn token_out_for(&self, route: &Route, amount: &BigInt) -> Result<BigInt> {
        let key = (route.identity(), amount.clone());
        if let Some(out) = self.output_cache.lock().await.get(&key) {
            if let Some(metrics) = &self.metrics {
                metrics.output_cache_hits.inc();
            }
            return Ok(out.clone());
        }
        if let Some(metrics) = &self.metrics {
            metrics.output_cache_misses.inc();
        }

        let (fees, _) = hop_swap_fees(route, &self.config.numeraire_denom, &self.incentivized_pool_ids)?;
        let hops = quote::simulate_route(route, amount, &fees).await?;
        let out = if hops.len() == route.hop_count() {
            hops.last().map_or_else(BigInt::zero, |hop| hop.amount.clone())
        } else {
            BigInt::zero()
        };

        self.output_cache.lock().await.insert(key, out.clone());
        Ok(out)
    }
}
