/*
 * Multi-tick swap simulation for concentrated-liquidity pools
 */

use num_bigint::BigInt;

use crate::math::decimal::Dec;
use crate::math::swap_strategy::{SwapDirection, SwapStep, SwapStrategy};
use crate::math::tick::{price_to_tick, tick_to_sqrt_price};
use crate::models::{Coin, Result, RouterError, TickDepth};

/// Pool state the simulator starts from.
#[derive(Debug, Clone, Copy)]
pub struct PoolSwapState<'a> {
    pub token0_denom: &'a str,
    pub current_sqrt_price: &'a Dec,
    pub current_tick: i64,
    pub current_liquidity: &'a Dec,
    pub exponent_at_price_one: i64,
    pub swap_fee: &'a Dec,
}

/// Outcome of a simulated swap. `amount` is the integer output for
/// out-given-in and the integer input for in-given-out.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSwap {
    pub amount: BigInt,
    pub amount_calculated: Dec,
    pub amount_specified_consumed: Dec,
    pub fee_total: Dec,
    pub fee_growth_global: Dec,
    pub after_sqrt_price: Dec,
    pub after_tick: i64,
    pub after_liquidity: Dec,
    pub num_ticks_crossed: usize,
}

struct SwapState {
    amount_remaining: Dec,
    amount_calculated: Dec,
    sqrt_price: Dec,
    tick: i64,
    liquidity: Dec,
    fee_growth_global: Dec,
    fee_total: Dec,
    ticks_crossed: usize,
}

impl SwapState {
    fn new(amount_specified: Dec, pool: &PoolSwapState<'_>) -> Self {
        Self {
            amount_remaining: amount_specified,
            amount_calculated: Dec::zero(),
            sqrt_price: pool.current_sqrt_price.clone(),
            tick: pool.current_tick,
            liquidity: pool.current_liquidity.clone(),
            fee_growth_global: Dec::zero(),
            fee_total: Dec::zero(),
            ticks_crossed: 0,
        }
    }

    fn is_done(&self, strategy: &SwapStrategy) -> bool {
        self.amount_remaining <= Dec::smallest() || self.sqrt_price == *strategy.sqrt_price_limit()
    }

    fn accrue_fee(&mut self, fee_charge: &Dec) -> Result<()> {
        if self.liquidity.is_positive() {
            self.fee_growth_global += &fee_charge.quo_truncate(&self.liquidity)?;
        }
        self.fee_total += fee_charge;
        Ok(())
    }

    /// Moves to the step's price, crossing `next_tick` if the step landed on it.
    fn advance(
        &mut self,
        strategy: &SwapStrategy,
        sqrt_price_next: Dec,
        next_tick: &TickDepth,
        next_tick_sqrt_price: &Dec,
        exponent_at_price_one: i64,
    ) -> Result<()> {
        if sqrt_price_next == *next_tick_sqrt_price {
            let delta = strategy.set_liquidity_delta_sign(&next_tick.net_liquidity);
            self.liquidity += &delta;
            if self.liquidity.is_negative() {
                return Err(RouterError::InvariantViolation(format!(
                    "liquidity {} is negative after crossing tick {}",
                    self.liquidity, next_tick.tick_index
                )));
            }
            self.tick = match strategy.direction() {
                SwapDirection::ZeroForOne => next_tick.tick_index - 1,
                SwapDirection::OneForZero => next_tick.tick_index,
            };
            self.ticks_crossed += 1;
        } else if sqrt_price_next != self.sqrt_price {
            let price = sqrt_price_next.mul_round(&sqrt_price_next);
            self.tick = price_to_tick(&price, exponent_at_price_one)?;
        }
        self.sqrt_price = sqrt_price_next;
        Ok(())
    }

    fn finish(self, amount_specified: &Dec, amount: BigInt) -> SimulatedSwap {
        SimulatedSwap {
            amount,
            amount_specified_consumed: amount_specified - &self.amount_remaining,
            amount_calculated: self.amount_calculated,
            fee_total: self.fee_total,
            fee_growth_global: self.fee_growth_global,
            after_sqrt_price: self.sqrt_price,
            after_tick: self.tick,
            after_liquidity: self.liquidity,
            num_ticks_crossed: self.ticks_crossed,
        }
    }
}

/// Simulates selling `token_in` into the pool across the supplied ticks.
///
/// `initialized_ticks` must be ordered in the swap direction. Running out of
/// ticks before the input is consumed yields `TickOverflow`, which callers
/// resolve by fetching a wider tick range.
pub fn calc_out_given_in(
    token_in: &Coin,
    pool: &PoolSwapState<'_>,
    initialized_ticks: &[TickDepth],
    sqrt_price_limit: Option<Dec>,
) -> Result<SimulatedSwap> {
    let direction = SwapDirection::from_token_in(token_in.denom == pool.token0_denom);
    let strategy = SwapStrategy::new(direction, pool.swap_fee.clone(), sqrt_price_limit)?;
    strategy.validate_sqrt_price_limit(pool.current_sqrt_price)?;

    let amount_specified = Dec::from(&token_in.amount);
    let mut state = SwapState::new(amount_specified.clone(), pool);
    let mut ticks = initialized_ticks.iter();

    while !state.is_done(&strategy) {
        let next_tick = ticks.next().ok_or(RouterError::TickOverflow)?;
        let next_tick_sqrt_price =
            tick_to_sqrt_price(next_tick.tick_index, pool.exponent_at_price_one)?;
        let target = strategy.sqrt_target_price(&next_tick_sqrt_price);

        let SwapStep {
            sqrt_price_next,
            amount_in,
            amount_out,
            fee_charge,
        } = strategy.compute_swap_step_out_given_in(
            &state.sqrt_price,
            &target,
            &state.liquidity,
            &state.amount_remaining,
        )?;

        state.amount_remaining -= &(amount_in + &fee_charge);
        state.amount_calculated += &amount_out;
        state.accrue_fee(&fee_charge)?;
        state.advance(
            &strategy,
            sqrt_price_next,
            next_tick,
            &next_tick_sqrt_price,
            pool.exponent_at_price_one,
        )?;
    }

    let amount_out = state.amount_calculated.truncate();
    Ok(state.finish(&amount_specified, amount_out))
}

/// Simulates buying `token_out` from the pool across the supplied ticks.
pub fn calc_in_given_out(
    token_out: &Coin,
    pool: &PoolSwapState<'_>,
    initialized_ticks: &[TickDepth],
    sqrt_price_limit: Option<Dec>,
) -> Result<SimulatedSwap> {
    // buying token1 means selling token0
    let direction = SwapDirection::from_token_in(token_out.denom != pool.token0_denom);
    let strategy = SwapStrategy::new(direction, pool.swap_fee.clone(), sqrt_price_limit)?;
    strategy.validate_sqrt_price_limit(pool.current_sqrt_price)?;

    let amount_specified = Dec::from(&token_out.amount);
    let mut state = SwapState::new(amount_specified.clone(), pool);
    let mut ticks = initialized_ticks.iter();

    while !state.is_done(&strategy) {
        let next_tick = ticks.next().ok_or(RouterError::TickOverflow)?;
        let next_tick_sqrt_price =
            tick_to_sqrt_price(next_tick.tick_index, pool.exponent_at_price_one)?;
        let target = strategy.sqrt_target_price(&next_tick_sqrt_price);

        let SwapStep {
            sqrt_price_next,
            amount_in,
            amount_out,
            fee_charge,
        } = strategy.compute_swap_step_in_given_out(
            &state.sqrt_price,
            &target,
            &state.liquidity,
            &state.amount_remaining,
        )?;

        state.amount_remaining -= &amount_out;
        state.amount_calculated += &(amount_in + &fee_charge);
        state.accrue_fee(&fee_charge)?;
        state.advance(
            &strategy,
            sqrt_price_next,
            next_tick,
            &next_tick_sqrt_price,
            pool.exponent_at_price_one,
        )?;
    }

    let amount_in = state.amount_calculated.round_up_int();
    Ok(state.finish(&amount_specified, amount_in))
}
