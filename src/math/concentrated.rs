/*
 * Closed-form sqrt-price and token-amount deltas for a single liquidity range
 */

use crate::math::decimal::Dec;
use crate::models::Result;

/// Amount of token0 between two sqrt prices: `L * (b - a) / (a * b)`.
pub fn calc_amount0_delta(
    liquidity: &Dec,
    sqrt_price_a: &Dec,
    sqrt_price_b: &Dec,
    round_up: bool,
) -> Result<Dec> {
    let (lower, upper) = if sqrt_price_a > sqrt_price_b {
        (sqrt_price_b, sqrt_price_a)
    } else {
        (sqrt_price_a, sqrt_price_b)
    };
    let diff = upper - lower;
    let numerator = liquidity.mul_round(&diff);

    if round_up {
        // rounding up here is what keeps in-given-out swaps from looping forever
        return Ok(numerator
            .quo_round_up(upper)?
            .quo_round_up(lower)?
            .ceil());
    }
    Ok(numerator.quo_truncate(upper)?.quo_truncate(lower)?)
}

/// Amount of token1 between two sqrt prices: `L * (b - a)`.
pub fn calc_amount1_delta(
    liquidity: &Dec,
    sqrt_price_a: &Dec,
    sqrt_price_b: &Dec,
    round_up: bool,
) -> Dec {
    let (lower, upper) = if sqrt_price_a > sqrt_price_b {
        (sqrt_price_b, sqrt_price_a)
    } else {
        (sqrt_price_a, sqrt_price_b)
    };
    let diff = upper - lower;

    if round_up {
        return liquidity.mul_round(&diff).ceil();
    }
    liquidity.mul_truncate(&diff)
}

pub fn next_sqrt_price_from_amount0_in_round_up(
    sqrt_price_current: &Dec,
    liquidity: &Dec,
    amount_remaining: &Dec,
) -> Result<Dec> {
    if amount_remaining.is_zero() {
        return Ok(sqrt_price_current.clone());
    }
    let product = amount_remaining.mul_round(sqrt_price_current);
    let denominator = liquidity + &product;
    Ok(liquidity
        .mul_round(sqrt_price_current)
        .quo_round_up(&denominator)?)
}

pub fn next_sqrt_price_from_amount0_out_round_up(
    sqrt_price_current: &Dec,
    liquidity: &Dec,
    amount_remaining: &Dec,
) -> Result<Dec> {
    if amount_remaining.is_zero() {
        return Ok(sqrt_price_current.clone());
    }
    let product = amount_remaining.mul_round(sqrt_price_current);
    let denominator = liquidity - &product;
    Ok(liquidity
        .mul_round(sqrt_price_current)
        .quo_round_up(&denominator)?)
}

pub fn next_sqrt_price_from_amount1_in_round_down(
    sqrt_price_current: &Dec,
    liquidity: &Dec,
    amount_remaining: &Dec,
) -> Result<Dec> {
    Ok(amount_remaining.quo_truncate(liquidity)? + sqrt_price_current)
}

pub fn next_sqrt_price_from_amount1_out_round_down(
    sqrt_price_current: &Dec,
    liquidity: &Dec,
    amount_remaining: &Dec,
) -> Result<Dec> {
    Ok(sqrt_price_current - &amount_remaining.quo_round_up(liquidity)?)
}

/// Fee owed on `amount_in` such that `amount_in + fee` pays the pool's fee
/// rate on the gross amount.
pub fn compute_fee_charge_from_amount_in(amount_in: &Dec, swap_fee: &Dec) -> Result<Dec> {
    Ok(amount_in
        .mul_round(swap_fee)
        .quo_round_up(&(Dec::one() - swap_fee))?)
}
