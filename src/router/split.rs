/*
 * Exhaustive search for the best split of an input amount across routes
 */

use std::collections::HashMap;

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::debug;

use crate::models::{Coin, Result, RouterError};
use crate::router::routes::{Route, RouteWithInAmount};

/// Quotes the output of sending `amount` through every hop of `route`.
#[async_trait]
pub trait RouteEvaluator: Send + Sync {
    async fn token_out_for(&self, route: &Route, amount: &BigInt) -> Result<BigInt>;
}

/// Every way of handing each route `i / iterations` of what the previous
/// routes left over. The last route takes the whole remainder, so every
/// allocation sums to `total`.
fn allocations(total: &BigInt, routes: usize, iterations: usize) -> Vec<Vec<BigInt>> {
    let mut leaves = Vec::new();
    let mut current = Vec::with_capacity(routes);
    expand(total, routes, iterations, &mut current, &mut leaves);
    leaves
}

fn expand(
    remaining: &BigInt,
    routes: usize,
    iterations: usize,
    current: &mut Vec<BigInt>,
    leaves: &mut Vec<Vec<BigInt>>,
) {
    if current.len() + 1 == routes {
        current.push(remaining.clone());
        leaves.push(current.clone());
        current.pop();
        return;
    }
    for step in 0..=iterations {
        let amount = remaining * BigInt::from(step) / BigInt::from(iterations);
        let left = remaining - &amount;
        current.push(amount);
        expand(&left, routes, iterations, current, leaves);
        current.pop();
    }
}

/// Picks the allocation of `token_in` over `routes` with the largest total
/// output. A route whose output is zero, or that lacks the liquidity for its
/// share, disqualifies the allocation.
pub async fn find_best_split_token_in(
    evaluator: &dyn RouteEvaluator,
    routes: &[Route],
    token_in: &Coin,
    max_iterations: usize,
) -> Result<Vec<RouteWithInAmount>> {
    if !token_in.amount.is_positive() {
        return Err(RouterError::InvalidAmount(format!(
            "{} {} must be positive",
            token_in.amount, token_in.denom
        )));
    }
    match routes {
        [] => return Ok(Vec::new()),
        [route] => {
            return Ok(vec![RouteWithInAmount {
                route: route.clone(),
                initial_amount: token_in.amount.clone(),
            }])
        }
        _ => {}
    }

    let iterations = max_iterations.max(1);
    let mut outputs: HashMap<(usize, BigInt), Option<BigInt>> = HashMap::new();
    let mut best: Option<(BigInt, Vec<BigInt>)> = None;

    'leaves: for allocation in allocations(&token_in.amount, routes.len(), iterations) {
        let mut total_out = BigInt::zero();
        for (index, amount) in allocation.iter().enumerate() {
            if amount.is_zero() {
                continue;
            }
            let key = (index, amount.clone());
            let output = match outputs.get(&key) {
                Some(output) => output.clone(),
                None => {
                    let output = match evaluator.token_out_for(&routes[index], amount).await {
                        Ok(out) if out.is_positive() => Some(out),
                        Ok(_) | Err(RouterError::NotEnoughLiquidity) => None,
                        Err(e) => return Err(e),
                    };
                    outputs.insert(key, output.clone());
                    output
                }
            };
            match output {
                Some(out) => total_out += out,
                None => continue 'leaves,
            }
        }

        if total_out.is_zero() {
            continue;
        }
        if best.as_ref().map_or(true, |(best_out, _)| total_out > *best_out) {
            best = Some((total_out, allocation));
        }
    }

    let (best_out, best_allocation) = best.ok_or(RouterError::NotEnoughLiquidity)?;

    debug!(
        token_in = %token_in.denom,
        amount = %token_in.amount,
        routes = routes.len(),
        evaluations = outputs.len(),
        best_out = %best_out,
        "Found best split"
    );

    Ok(routes
        .iter()
        .zip(best_allocation)
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(route, initial_amount)| RouteWithInAmount {
            route: route.clone(),
            initial_amount,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::math::decimal::Dec;
    use crate::pools::{ConstantProductPool, Pool, RoutablePool};

    /// Route `i` pays out `amount * rate[i]`, capped at `cap[i]` units of input.
    struct LinearEvaluator {
        rates: HashMap<String, (i64, Option<i64>)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RouteEvaluator for LinearEvaluator {
        async fn token_out_for(&self, route: &Route, amount: &BigInt) -> Result<BigInt> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (rate, cap) = self.rates[route.pools()[0].id()];
            if cap.map_or(false, |cap| *amount > BigInt::from(cap)) {
                return Err(RouterError::NotEnoughLiquidity);
            }
            Ok(amount * rate)
        }
    }

    /// Concave payout: output grows with the square root of the input.
    struct SqrtEvaluator;

    #[async_trait]
    impl RouteEvaluator for SqrtEvaluator {
        async fn token_out_for(&self, _route: &Route, amount: &BigInt) -> Result<BigInt> {
            Ok(Dec::from(amount * 1_000_000).approx_sqrt().truncate())
        }
    }

    fn route(id: &str) -> Route {
        let pool = ConstantProductPool::new(
            id,
            [Coin::new("a", 1_000), Coin::new("b", 1_000)],
            Dec::zero(),
        )
        .unwrap();
        Route::new(vec![Arc::new(Pool::ConstantProduct(pool))], vec!["b".to_string()], "a").unwrap()
    }

    fn linear(rates: &[(&str, i64, Option<i64>)]) -> LinearEvaluator {
        LinearEvaluator {
            rates: rates
                .iter()
                .map(|(id, rate, cap)| (id.to_string(), (*rate, *cap)))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    fn amounts(split: &[RouteWithInAmount]) -> Vec<(String, BigInt)> {
        split
            .iter()
            .map(|r| (r.route.pools()[0].id().to_string(), r.initial_amount.clone()))
            .collect()
    }

    #[tokio::test]
    async fn no_routes_is_empty_and_one_route_takes_everything() {
        let evaluator = linear(&[("1", 1, None)]);
        let token_in = Coin::new("a", 100);

        assert!(find_best_split_token_in(&evaluator, &[], &token_in, 10)
            .await
            .unwrap()
            .is_empty());

        let split = find_best_split_token_in(&evaluator, &[route("1")], &token_in, 10)
            .await
            .unwrap();
        assert_eq!(amounts(&split), vec![("1".to_string(), BigInt::from(100))]);
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn better_route_takes_the_whole_amount() {
        let evaluator = linear(&[("1", 1, None), ("2", 2, None)]);
        let split = find_best_split_token_in(
            &evaluator,
            &[route("1"), route("2")],
            &Coin::new("a", 100),
            10,
        )
        .await
        .unwrap();
        assert_eq!(amounts(&split), vec![("2".to_string(), BigInt::from(100))]);
    }

    #[tokio::test]
    async fn concave_routes_split_evenly() {
        let split = find_best_split_token_in(
            &SqrtEvaluator,
            &[route("1"), route("2")],
            &Coin::new("a", 1_000),
            10,
        )
        .await
        .unwrap();

        assert_eq!(
            amounts(&split),
            vec![
                ("1".to_string(), BigInt::from(500)),
                ("2".to_string(), BigInt::from(500))
            ]
        );
    }

    #[tokio::test]
    async fn capped_route_spills_into_the_other() {
        let evaluator = linear(&[("1", 3, Some(40)), ("2", 1, None)]);
        let split = find_best_split_token_in(
            &evaluator,
            &[route("1"), route("2")],
            &Coin::new("a", 100),
            10,
        )
        .await
        .unwrap();

        assert_eq!(
            amounts(&split),
            vec![
                ("1".to_string(), BigInt::from(40)),
                ("2".to_string(), BigInt::from(60))
            ]
        );
        let allocated: BigInt = split.iter().map(|r| &r.initial_amount).sum();
        assert_eq!(allocated, BigInt::from(100));
    }

    #[tokio::test]
    async fn outputs_are_memoised() {
        let evaluator = linear(&[("1", 1, None), ("2", 1, None)]);
        find_best_split_token_in(&evaluator, &[route("1"), route("2")], &Coin::new("a", 100), 10)
            .await
            .unwrap();

        // each route sees the ten non-zero multiples of 10
        assert_eq!(evaluator.calls.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn remainder_fills_the_capped_better_route() {
        let evaluator = linear(&[("1", 1, None), ("2", 10, Some(45))]);
        let split = find_best_split_token_in(
            &evaluator,
            &[route("1"), route("2")],
            &Coin::new("a", 100),
            10,
        )
        .await
        .unwrap();

        assert_eq!(
            amounts(&split),
            vec![
                ("1".to_string(), BigInt::from(60)),
                ("2".to_string(), BigInt::from(40))
            ]
        );
    }

    #[tokio::test]
    async fn uneven_amounts_are_allocated_in_full() {
        let evaluator = linear(&[("1", 1, None), ("2", 10, Some(45))]);
        let split = find_best_split_token_in(
            &evaluator,
            &[route("1"), route("2")],
            &Coin::new("a", 97),
            10,
        )
        .await
        .unwrap();

        // 97 * 6 / 10 truncates to 58, leaving 39 for the capped route
        assert_eq!(
            amounts(&split),
            vec![
                ("1".to_string(), BigInt::from(58)),
                ("2".to_string(), BigInt::from(39))
            ]
        );
    }

    #[test]
    fn every_allocation_sums_to_the_total() {
        let total = BigInt::from(1_003);
        let leaves = allocations(&total, 3, 7);
        assert_eq!(leaves.len(), 8 * 8);
        assert!(leaves
            .iter()
            .all(|leaf| leaf.len() == 3 && leaf.iter().sum::<BigInt>() == total));
    }

    #[tokio::test]
    async fn insufficient_combined_liquidity_fails() {
        let evaluator = linear(&[("1", 1, Some(30)), ("2", 1, Some(30))]);
        let err = find_best_split_token_in(
            &evaluator,
            &[route("1"), route("2")],
            &Coin::new("a", 100),
            10,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RouterError::NotEnoughLiquidity));
    }

    #[tokio::test]
    async fn other_errors_propagate() {
        struct Failing;

        #[async_trait]
        impl RouteEvaluator for Failing {
            async fn token_out_for(&self, _route: &Route, _amount: &BigInt) -> Result<BigInt> {
                Err(RouterError::TickSource("offline".to_string()))
            }
        }

        let err = find_best_split_token_in(&Failing, &[route("1"), route("2")], &Coin::new("a", 10), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::TickSource(_)));
    }
}
