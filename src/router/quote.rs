/*
 * Hop-by-hop simulation of split routes and aggregation into a single quote
 */

use std::collections::HashSet;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::math::decimal::Dec;
use crate::models::{Coin, Result, RouterError, SwapResult};
use crate::pools::RoutablePool;
use crate::router::routes::{Route, RouteWithInAmount};
use crate::utils::calculate_price_impact;

/// Outcome of sending an amount through one or more routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTokenInQuote {
    #[serde(with = "crate::utils::bigint_string")]
    pub amount: BigInt,
    pub before_spot_price_in_over_out: Dec,
    pub before_spot_price_out_over_in: Dec,
    pub after_spot_price_in_over_out: Dec,
    pub after_spot_price_out_over_in: Dec,
    pub effective_price_in_over_out: Dec,
    pub effective_price_out_over_in: Dec,
    /// Input spent on fees across all routes.
    #[serde(with = "crate::utils::bigint_string")]
    pub token_in_fee_amount: BigInt,
    pub swap_fee: Dec,
    pub price_impact_token_out: Dec,
    /// Some route was discounted for routing through the numeraire.
    pub numeraire_discount: bool,
    /// Some hop produced nothing; every other field is zero.
    pub zero_output: bool,
}

impl SplitTokenInQuote {
    fn zero(numeraire_discount: bool) -> Self {
        Self {
            amount: BigInt::zero(),
            before_spot_price_in_over_out: Dec::zero(),
            before_spot_price_out_over_in: Dec::zero(),
            after_spot_price_in_over_out: Dec::zero(),
            after_spot_price_out_over_in: Dec::zero(),
            effective_price_in_over_out: Dec::zero(),
            effective_price_out_over_in: Dec::zero(),
            token_in_fee_amount: BigInt::zero(),
            swap_fee: Dec::zero(),
            price_impact_token_out: Dec::zero(),
            numeraire_discount,
            zero_output: true,
        }
    }
}

/// Swap fee charged by each hop of `route`.
///
/// A two-hop route through `numeraire_denom` whose pools are both
/// incentivized pays only the larger of the two fees, shared between the
/// hops in proportion to their own fees. The flag reports that case.
pub fn hop_swap_fees(
    route: &Route,
    numeraire_denom: &str,
    incentivized_pool_ids: &HashSet<String>,
) -> Result<(Vec<Dec>, bool)> {
    let fees: Vec<Dec> = route.pools().iter().map(|p| p.swap_fee().clone()).collect();

    let through_numeraire = route.hop_count() == 2
        && route.token_out_denoms().first().is_some_and(|d| d == numeraire_denom)
        && route
            .pools()
            .iter()
            .all(|p| incentivized_pool_ids.contains(p.id()));
    if !through_numeraire {
        return Ok((fees, false));
    }

    let sum = fees.iter().fold(Dec::zero(), |acc, fee| acc + fee);
    if sum.is_zero() {
        return Ok((fees, true));
    }
    let max = fees.iter().max().cloned().unwrap_or_default();
    let discounted = fees
        .iter()
        .map(|fee| fee.mul_round(&max).quo_round(&sum))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((discounted, true))
}

/// Quotes every hop of `route` in order, feeding each output into the next
/// hop. Stops after the first hop that produces nothing.
pub async fn simulate_route(route: &Route, amount: &BigInt, fees: &[Dec]) -> Result<Vec<SwapResult>> {
    let mut results = Vec::with_capacity(route.hop_count());
    let mut amount = amount.clone();

    for (index, pool) in route.pools().iter().enumerate() {
        let (token_in_denom, token_out_denom) = route.hop_denoms(index)?;
        let token_in = Coin::new(token_in_denom, amount.clone());
        let result = pool
            .get_token_out_by_token_in(&token_in, token_out_denom, fees.get(index))
            .await?;
        amount = result.amount.clone();
        results.push(result);
        if !amount.is_positive() {
            break;
        }
    }
    Ok(results)
}

/// Compounds per-hop fees into the fee of the whole route.
fn compound_fee(fees: &[Dec]) -> Dec {
    fees.iter().fold(Dec::zero(), |total, fee| {
        let remaining = Dec::one() - &total;
        total + remaining.mul_round(fee)
    })
}

fn product<'a>(prices: impl Iterator<Item = &'a Dec>) -> Dec {
    prices.fold(Dec::one(), |acc, price| acc.mul_round(price))
}

fn invert(price: &Dec) -> Result<Dec> {
    if price.is_zero() {
        return Ok(Dec::zero());
    }
    Ok(Dec::one().quo_round(price)?)
}

/// Simulates `routes` and aggregates them into one quote. Spot prices are
/// averaged over routes weighted by their share of the input.
pub async fn calculate_token_out_by_token_in(
    routes: &[RouteWithInAmount],
    numeraire_denom: &str,
    incentivized_pool_ids: &HashSet<String>,
) -> Result<SplitTokenInQuote> {
    let total_in: BigInt = routes.iter().map(|r| &r.initial_amount).sum();
    if !total_in.is_positive() {
        return Err(RouterError::InvalidAmount(format!(
            "routes carry a total of {total_in}"
        )));
    }
    let total_in_dec = Dec::from(&total_in);

    let mut amount_out = BigInt::zero();
    let mut before_in_over_out = Dec::zero();
    let mut after_in_over_out = Dec::zero();
    let mut swap_fee = Dec::zero();
    let mut fee_amount = Dec::zero();
    let mut numeraire_discount = false;

    for route_with_amount in routes {
        let route = &route_with_amount.route;
        let initial_amount = Dec::from(&route_with_amount.initial_amount);

        let (fees, discounted) = hop_swap_fees(route, numeraire_denom, incentivized_pool_ids)?;
        numeraire_discount |= discounted;

        let hops = simulate_route(route, &route_with_amount.initial_amount, &fees).await?;
        if hops.len() < route.hop_count() || hops.iter().any(|hop| !hop.amount.is_positive()) {
            debug!(route = %route, "Route produced no output");
            return Ok(SplitTokenInQuote::zero(numeraire_discount));
        }

        let weight = initial_amount.quo_round(&total_in_dec)?;
        let route_fee = compound_fee(&fees);
        before_in_over_out += &product(hops.iter().map(|h| &h.before_spot_price_in_over_out))
            .mul_round(&weight);
        after_in_over_out += &product(hops.iter().map(|h| &h.after_spot_price_in_over_out))
            .mul_round(&weight);
        swap_fee += &route_fee.mul_round(&weight);
        fee_amount += &initial_amount.mul_round(&route_fee);
        if let Some(last) = hops.last() {
            amount_out += &last.amount;
        }
    }

    let amount_out_dec = Dec::from(&amount_out);
    let effective_price_in_over_out = total_in_dec.quo_round(&amount_out_dec)?;
    let price_impact_token_out =
        calculate_price_impact(&effective_price_in_over_out, &before_in_over_out)?;

    debug!(
        routes = routes.len(),
        amount_in = %total_in,
        amount_out = %amount_out,
        numeraire_discount,
        "Calculated split quote"
    );

    Ok(SplitTokenInQuote {
        amount: amount_out,
        before_spot_price_out_over_in: invert(&before_in_over_out)?,
        after_spot_price_out_over_in: invert(&after_in_over_out)?,
        before_spot_price_in_over_out: before_in_over_out,
        after_spot_price_in_over_out: after_in_over_out,
        effective_price_out_over_in: amount_out_dec.quo_round(&total_in_dec)?,
        effective_price_in_over_out,
        token_in_fee_amount: fee_amount.truncate(),
        swap_fee,
        price_impact_token_out,
        numeraire_discount,
        zero_output: false,
    })
}
