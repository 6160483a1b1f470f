/*
 * Two-asset x*y=k curve math
 */

use crate::math::decimal::Dec;
use crate::models::{Result, RouterError};

/// Output for selling `amount_in` into the pool; rounds in the pool's favour.
pub fn calc_out_given_in(
    reserve_in: &Dec,
    reserve_out: &Dec,
    amount_in: &Dec,
    swap_fee: &Dec,
) -> Result<Dec> {
    if !reserve_in.is_positive() || !reserve_out.is_positive() {
        return Err(RouterError::NotEnoughLiquidity);
    }
    let amount_in_after_fee = amount_in.mul_truncate(&(Dec::one() - swap_fee));
    let ratio = reserve_in.quo_round_up(&(reserve_in + &amount_in_after_fee))?;
    Ok(reserve_out.mul_truncate(&(Dec::one() - ratio)))
}

/// Input required to buy `amount_out` from the pool, fee included.
pub fn calc_in_given_out(
    reserve_in: &Dec,
    reserve_out: &Dec,
    amount_out: &Dec,
    swap_fee: &Dec,
) -> Result<Dec> {
    if amount_out >= reserve_out {
        return Err(RouterError::NotEnoughLiquidity);
    }
    let ratio = reserve_out.quo_round_up(&(reserve_out - amount_out))?;
    let amount_in_before_fee = reserve_in.mul_round_up(&(ratio - Dec::one()));
    Ok(amount_in_before_fee.quo_round_up(&(Dec::one() - swap_fee))?)
}

pub fn spot_price(reserve_in: &Dec, reserve_out: &Dec) -> Result<Dec> {
    Ok(reserve_in.quo_round(reserve_out)?)
}
