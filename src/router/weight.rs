/*
 * Heuristic route scoring used to pick which routes the split search considers
 */

use rust_decimal::Decimal;

use crate::pools::RoutablePool;
use crate::router::routes::Route;

/// Scores a candidate route; higher is better. Scores only order routes,
/// they never enter a quote, so `rust_decimal` precision is enough.
pub trait RouteWeigher: Send + Sync {
    fn weight(&self, route: &Route) -> Decimal;
}

impl<F> RouteWeigher for F
where
    F: Fn(&Route) -> Decimal + Send + Sync,
{
    fn weight(&self, route: &Route) -> Decimal {
        self(route)
    }
}

/// Shallowest hop liquidity divided by the number of hops.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiquidityWeigher;

impl RouteWeigher for LiquidityWeigher {
    fn weight(&self, route: &Route) -> Decimal {
        let min_liquidity = route
            .pools()
            .iter()
            .map(|pool| pool.normalized_liquidity().to_decimal_lossy())
            .min()
            .unwrap_or(Decimal::ZERO);

        if route.hop_count() == 0 {
            return Decimal::ZERO;
        }
        min_liquidity / Decimal::from(route.hop_count())
    }
}

/// Sorts routes by descending weight. Ties keep discovery order.
pub fn sort_by_weight(routes: &mut [Route], weigher: &dyn RouteWeigher) {
    let mut weighted: Vec<(Decimal, Route)> = routes
        .iter()
        .map(|route| (weigher.weight(route), route.clone()))
        .collect();
    weighted.sort_by(|a, b| b.0.cmp(&a.0));
    for (slot, (_, route)) in routes.iter_mut().zip(weighted) {
        *slot = route;
    }
}
