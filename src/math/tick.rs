/*
 * Tick math: conversions between tick indexes and (sqrt) prices on the
 * geometric price grid used by concentrated-liquidity pools
 */

use num_traits::ToPrimitive;

use crate::math::decimal::{BigDec, Dec};
use crate::models::{Coin, Result, RouterError};

pub const EXPONENT_AT_PRICE_ONE_MIN: i64 = -12;
pub const EXPONENT_AT_PRICE_ONE_MAX: i64 = -1;

/// Decimal exponents of the global spot price bounds.
const MIN_SPOT_PRICE_EXPONENT: i64 = -12;
const MAX_SPOT_PRICE_EXPONENT: i64 = 38;

#[must_use]
pub fn min_spot_price() -> Dec {
    Dec::pow10(MIN_SPOT_PRICE_EXPONENT)
}

#[must_use]
pub fn max_spot_price() -> Dec {
    Dec::pow10(MAX_SPOT_PRICE_EXPONENT)
}

#[must_use]
pub fn min_sqrt_price() -> Dec {
    Dec::pow10(MIN_SPOT_PRICE_EXPONENT / 2)
}

#[must_use]
pub fn max_sqrt_price() -> Dec {
    Dec::pow10(MAX_SPOT_PRICE_EXPONENT / 2)
}

fn validate_exponent(exponent_at_price_one: i64) -> Result<()> {
    if !(EXPONENT_AT_PRICE_ONE_MIN..=EXPONENT_AT_PRICE_ONE_MAX).contains(&exponent_at_price_one) {
        return Err(RouterError::Range(format!(
            "exponent at price one {exponent_at_price_one} outside [{EXPONENT_AT_PRICE_ONE_MIN}, {EXPONENT_AT_PRICE_ONE_MAX}]"
        )));
    }
    Ok(())
}

fn validate_spot_price(price: &Dec) -> Result<()> {
    if *price > max_spot_price() || *price < min_spot_price() {
        return Err(RouterError::Range(format!(
            "price {price} outside [{}, {}]",
            min_spot_price(),
            max_spot_price()
        )));
    }
    Ok(())
}

/// Number of ticks it takes for the price to grow by one power of ten.
fn geometric_exponent_increment_distance(exponent_at_price_one: i64) -> i64 {
    9 * 10_i64.pow(exponent_at_price_one.unsigned_abs() as u32)
}

/// Inclusive tick bounds for the given precision, derived from the global
/// spot price bounds.
pub fn min_max_ticks(exponent_at_price_one: i64) -> Result<(i64, i64)> {
    validate_exponent(exponent_at_price_one)?;
    let distance = geometric_exponent_increment_distance(exponent_at_price_one);
    Ok((
        distance * MIN_SPOT_PRICE_EXPONENT,
        distance * MAX_SPOT_PRICE_EXPONENT,
    ))
}

fn validate_tick(tick_index: i64, exponent_at_price_one: i64) -> Result<()> {
    let (min_tick, max_tick) = min_max_ticks(exponent_at_price_one)?;
    if tick_index < min_tick || tick_index > max_tick {
        return Err(RouterError::Range(format!(
            "tick {tick_index} outside [{min_tick}, {max_tick}]"
        )));
    }
    Ok(())
}

/// Price at a tick index.
pub fn tick_to_price(tick_index: i64, exponent_at_price_one: i64) -> Result<Dec> {
    if tick_index == 0 {
        return Ok(Dec::one());
    }
    validate_tick(tick_index, exponent_at_price_one)?;

    let distance = geometric_exponent_increment_distance(exponent_at_price_one);
    let geometric_exponent_delta = tick_index / distance;

    // Negative ticks step into the next-finer band immediately, otherwise
    // ticks 0 to -distance would reuse the precision at price one.
    let mut exponent_at_current_tick = exponent_at_price_one + geometric_exponent_delta;
    if tick_index < 0 {
        exponent_at_current_tick -= 1;
    }

    let additive_increment = BigDec::pow10(exponent_at_current_tick);
    let num_additive_ticks = tick_index - geometric_exponent_delta * distance;

    let price = BigDec::pow10(geometric_exponent_delta)
        + BigDec::from(num_additive_ticks).mul_round(&additive_increment);
    let price = price.to_dec();

    validate_spot_price(&price)?;
    Ok(price)
}

/// Square root of the price at a tick index.
pub fn tick_to_sqrt_price(tick_index: i64, exponent_at_price_one: i64) -> Result<Dec> {
    if tick_index == 0 {
        return Ok(Dec::one());
    }
    Ok(tick_to_price(tick_index, exponent_at_price_one)?.approx_sqrt())
}

/// Index of the highest tick whose price does not exceed `price`.
pub fn price_to_tick(price: &Dec, exponent_at_price_one: i64) -> Result<i64> {
    if *price == Dec::one() {
        return Ok(0);
    }
    if price.is_negative() {
        return Err(RouterError::Range(format!("price {price} is negative")));
    }
    validate_spot_price(price)?;
    validate_exponent(exponent_at_price_one)?;

    let distance_in_ticks = geometric_exponent_increment_distance(exponent_at_price_one);
    let distance = BigDec::from(distance_in_ticks);
    let target = price.to_big_dec();

    let mut current_price = BigDec::one();
    let mut ticks_passed: i64 = 0;
    let mut additive_increment = BigDec::pow10(exponent_at_price_one);

    if target > current_price {
        let mut exponent_at_current_tick = exponent_at_price_one;
        while current_price < target {
            additive_increment = BigDec::pow10(exponent_at_current_tick);
            current_price += &distance.mul_round(&additive_increment);
            exponent_at_current_tick += 1;
            ticks_passed += distance_in_ticks;
        }
    } else {
        let mut exponent_at_current_tick = exponent_at_price_one - 1;
        while current_price > target {
            additive_increment = BigDec::pow10(exponent_at_current_tick);
            current_price -= &distance.mul_round(&additive_increment);
            exponent_at_current_tick -= 1;
            ticks_passed -= distance_in_ticks;
        }
    }

    // negative when the loop overshot the target
    let ticks_in_band = (target - &current_price).quo_truncate(&additive_increment)?;
    let ticks_in_band = ticks_in_band.floor_int().to_i64().ok_or_else(|| {
        RouterError::Range(format!("tick offset for price {price} does not fit in i64"))
    })?;

    let tick_index = ticks_passed + ticks_in_band;
    validate_tick(tick_index, exponent_at_price_one)?;
    Ok(tick_index)
}

/// Rough tick bound a swap of `specified` is expected to reach, used to size
/// the first tick-data fetch.
///
/// Moves the sqrt price linearly by `amount / liquidity` from the current
/// price, assuming the current tick's liquidity holds for the whole swap.
pub fn estimate_initial_tick_bound(
    specified: &Coin,
    is_out_given_in: bool,
    token0_denom: &str,
    current_sqrt_price: &Dec,
    current_tick_liquidity: &Dec,
    exponent_at_price_one: i64,
) -> Result<i64> {
    // token0 entering the pool pushes the price down
    let token0_flows_in = if is_out_given_in {
        specified.denom == token0_denom
    } else {
        specified.denom != token0_denom
    };

    let target_price = if current_tick_liquidity.is_zero() {
        if token0_flows_in {
            min_spot_price()
        } else {
            max_spot_price()
        }
    } else {
        let sqrt_delta = Dec::from(&specified.amount).quo_truncate(current_tick_liquidity)?;
        let target_sqrt = if token0_flows_in {
            current_sqrt_price - &sqrt_delta
        } else {
            current_sqrt_price + &sqrt_delta
        };
        if target_sqrt.is_positive() {
            target_sqrt
                .mul_round(&target_sqrt)
                .clamp(min_spot_price(), max_spot_price())
        } else {
            min_spot_price()
        }
    };

    price_to_tick(&target_price, exponent_at_price_one)
}
