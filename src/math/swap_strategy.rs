/*
 * Direction-specific swap step computation for concentrated-liquidity pools
 */

use crate::math::concentrated::{
    calc_amount0_delta, calc_amount1_delta, compute_fee_charge_from_amount_in,
    next_sqrt_price_from_amount0_in_round_up, next_sqrt_price_from_amount0_out_round_up,
    next_sqrt_price_from_amount1_in_round_down, next_sqrt_price_from_amount1_out_round_down,
};
use crate::math::decimal::Dec;
use crate::math::tick::{max_sqrt_price, min_sqrt_price};
use crate::models::{Result, RouterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    /// token0 in, token1 out; price moves down.
    ZeroForOne,
    /// token1 in, token0 out; price moves up.
    OneForZero,
}

impl SwapDirection {
    #[must_use]
    pub fn from_token_in(token_in_is_token0: bool) -> Self {
        if token_in_is_token0 {
            SwapDirection::ZeroForOne
        } else {
            SwapDirection::OneForZero
        }
    }
}

/// Outcome of one swap step within a single liquidity range.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapStep {
    pub sqrt_price_next: Dec,
    pub amount_in: Dec,
    pub amount_out: Dec,
    pub fee_charge: Dec,
}

#[derive(Debug, Clone)]
pub struct SwapStrategy {
    direction: SwapDirection,
    swap_fee: Dec,
    sqrt_price_limit: Dec,
}

impl SwapStrategy {
    /// Builds a strategy; without a limit the price may run to the global bound.
    pub fn new(direction: SwapDirection, swap_fee: Dec, sqrt_price_limit: Option<Dec>) -> Result<Self> {
        if swap_fee.is_negative() {
            return Err(RouterError::InvariantViolation(format!(
                "swap fee {swap_fee} is negative"
            )));
        }
        if swap_fee >= Dec::one() {
            return Err(RouterError::Range(format!("swap fee {swap_fee} must be below 1")));
        }

        let sqrt_price_limit = sqrt_price_limit.unwrap_or_else(|| match direction {
            SwapDirection::ZeroForOne => min_sqrt_price(),
            SwapDirection::OneForZero => max_sqrt_price(),
        });
        if sqrt_price_limit < min_sqrt_price() || sqrt_price_limit > max_sqrt_price() {
            return Err(RouterError::Range(format!(
                "sqrt price limit {sqrt_price_limit} outside global bounds"
            )));
        }

        Ok(Self {
            direction,
            swap_fee,
            sqrt_price_limit,
        })
    }

    #[must_use]
    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    #[must_use]
    pub fn swap_fee(&self) -> &Dec {
        &self.swap_fee
    }

    #[must_use]
    pub fn sqrt_price_limit(&self) -> &Dec {
        &self.sqrt_price_limit
    }

    /// Rejects a limit that sits behind the current price.
    pub fn validate_sqrt_price_limit(&self, sqrt_price_current: &Dec) -> Result<()> {
        let wrong_side = match self.direction {
            SwapDirection::ZeroForOne => self.sqrt_price_limit > *sqrt_price_current,
            SwapDirection::OneForZero => self.sqrt_price_limit < *sqrt_price_current,
        };
        if wrong_side {
            return Err(RouterError::Range(format!(
                "sqrt price limit {} is on the wrong side of current sqrt price {sqrt_price_current} for {:?}",
                self.sqrt_price_limit, self.direction
            )));
        }
        Ok(())
    }

    /// The nearer of the next initialized tick and the price limit.
    #[must_use]
    pub fn sqrt_target_price(&self, next_tick_sqrt_price: &Dec) -> Dec {
        match self.direction {
            SwapDirection::ZeroForOne => {
                if *next_tick_sqrt_price < self.sqrt_price_limit {
                    self.sqrt_price_limit.clone()
                } else {
                    next_tick_sqrt_price.clone()
                }
            }
            SwapDirection::OneForZero => {
                if *next_tick_sqrt_price > self.sqrt_price_limit {
                    self.sqrt_price_limit.clone()
                } else {
                    next_tick_sqrt_price.clone()
                }
            }
        }
    }

    /// Net liquidity is recorded for left-to-right crossings.
    #[must_use]
    pub fn set_liquidity_delta_sign(&self, delta: &Dec) -> Dec {
        match self.direction {
            SwapDirection::ZeroForOne => -delta,
            SwapDirection::OneForZero => delta.clone(),
        }
    }

    pub fn compute_swap_step_out_given_in(
        &self,
        sqrt_price_current: &Dec,
        sqrt_price_target: &Dec,
        liquidity: &Dec,
        amount_remaining_in: &Dec,
    ) -> Result<SwapStep> {
        let remaining_less_fee = amount_remaining_in.mul_round(&(Dec::one() - &self.swap_fee));

        let (sqrt_price_next, amount_in, amount_out) = match self.direction {
            SwapDirection::ZeroForOne => {
                let mut amount_in =
                    calc_amount0_delta(liquidity, sqrt_price_target, sqrt_price_current, true)?;
                let sqrt_price_next = if remaining_less_fee >= amount_in {
                    sqrt_price_target.clone()
                } else {
                    next_sqrt_price_from_amount0_in_round_up(
                        sqrt_price_current,
                        liquidity,
                        &remaining_less_fee,
                    )?
                };
                if sqrt_price_next != *sqrt_price_target {
                    amount_in =
                        calc_amount0_delta(liquidity, &sqrt_price_next, sqrt_price_current, true)?;
                }
                let amount_out =
                    calc_amount1_delta(liquidity, &sqrt_price_next, sqrt_price_current, false);
                (sqrt_price_next, amount_in, amount_out)
            }
            SwapDirection::OneForZero => {
                let mut amount_in =
                    calc_amount1_delta(liquidity, sqrt_price_target, sqrt_price_current, true);
                let sqrt_price_next = if remaining_less_fee >= amount_in {
                    sqrt_price_target.clone()
                } else {
                    next_sqrt_price_from_amount1_in_round_down(
                        sqrt_price_current,
                        liquidity,
                        &remaining_less_fee,
                    )?
                };
                if sqrt_price_next != *sqrt_price_target {
                    amount_in =
                        calc_amount1_delta(liquidity, &sqrt_price_next, sqrt_price_current, true);
                }
                let amount_out =
                    calc_amount0_delta(liquidity, &sqrt_price_next, sqrt_price_current, false)?;
                (sqrt_price_next, amount_in, amount_out)
            }
        };

        let has_reached_target = sqrt_price_next == *sqrt_price_target;
        let fee_charge = self.fee_charge_out_given_in(has_reached_target, &amount_in, amount_remaining_in)?;

        Ok(SwapStep {
            sqrt_price_next,
            amount_in,
            amount_out,
            fee_charge,
        })
    }

    pub fn compute_swap_step_in_given_out(
        &self,
        sqrt_price_current: &Dec,
        sqrt_price_target: &Dec,
        liquidity: &Dec,
        amount_remaining_out: &Dec,
    ) -> Result<SwapStep> {
        let (sqrt_price_next, amount_in, amount_out) = match self.direction {
            SwapDirection::ZeroForOne => {
                let mut amount_out =
                    calc_amount1_delta(liquidity, sqrt_price_target, sqrt_price_current, false);
                let sqrt_price_next = if *amount_remaining_out >= amount_out {
                    sqrt_price_target.clone()
                } else {
                    next_sqrt_price_from_amount1_out_round_down(
                        sqrt_price_current,
                        liquidity,
                        amount_remaining_out,
                    )?
                };
                if sqrt_price_next != *sqrt_price_target {
                    amount_out =
                        calc_amount1_delta(liquidity, &sqrt_price_next, sqrt_price_current, false);
                }
                let amount_in =
                    calc_amount0_delta(liquidity, &sqrt_price_next, sqrt_price_current, true)?;
                (sqrt_price_next, amount_in, amount_out)
            }
            SwapDirection::OneForZero => {
                let mut amount_out =
                    calc_amount0_delta(liquidity, sqrt_price_target, sqrt_price_current, false)?;
                let sqrt_price_next = if *amount_remaining_out >= amount_out {
                    sqrt_price_target.clone()
                } else {
                    next_sqrt_price_from_amount0_out_round_up(
                        sqrt_price_current,
                        liquidity,
                        amount_remaining_out,
                    )?
                };
                if sqrt_price_next != *sqrt_price_target {
                    amount_out =
                        calc_amount0_delta(liquidity, &sqrt_price_next, sqrt_price_current, false)?;
                }
                let amount_in =
                    calc_amount1_delta(liquidity, &sqrt_price_next, sqrt_price_current, true);
                (sqrt_price_next, amount_in, amount_out)
            }
        };

        let fee_charge = if self.swap_fee.is_zero() {
            Dec::zero()
        } else {
            compute_fee_charge_from_amount_in(&amount_in, &self.swap_fee)?
        };

        Ok(SwapStep {
            sqrt_price_next,
            amount_in,
            amount_out,
            fee_charge,
        })
    }

    /// When the target is reached the fee is charged on what was consumed;
    /// otherwise everything left over after the consumed amount is fee.
    fn fee_charge_out_given_in(
        &self,
        has_reached_target: bool,
        amount_in: &Dec,
        amount_remaining_in: &Dec,
    ) -> Result<Dec> {
        if self.swap_fee.is_zero() {
            return Ok(Dec::zero());
        }

        let fee_charge = if has_reached_target {
            compute_fee_charge_from_amount_in(amount_in, &self.swap_fee)?
        } else {
            amount_remaining_in - amount_in
        };

        if fee_charge.is_negative() {
            return Err(RouterError::InvariantViolation(format!(
                "fee charge must be non-negative, was {fee_charge}"
            )));
        }
        Ok(fee_charge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick::tick_to_sqrt_price;
    use proptest::prelude::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn target_price_respects_limit_per_direction() {
        let zero_for_one =
            SwapStrategy::new(SwapDirection::ZeroForOne, Dec::zero(), Some(dec("70"))).unwrap();
        assert_eq!(zero_for_one.sqrt_target_price(&dec("69")), dec("70"));
        assert_eq!(zero_for_one.sqrt_target_price(&dec("70.5")), dec("70.5"));

        let one_for_zero =
            SwapStrategy::new(SwapDirection::OneForZero, Dec::zero(), Some(dec("71"))).unwrap();
        assert_eq!(one_for_zero.sqrt_target_price(&dec("72")), dec("71"));
        assert_eq!(one_for_zero.sqrt_target_price(&dec("70.9")), dec("70.9"));
    }

    #[test]
    fn liquidity_sign_depends_on_direction() {
        let delta = dec("10");
        let down = SwapStrategy::new(SwapDirection::ZeroForOne, Dec::zero(), None).unwrap();
        let up = SwapStrategy::new(SwapDirection::OneForZero, Dec::zero(), None).unwrap();
        assert_eq!(down.set_liquidity_delta_sign(&delta), dec("-10"));
        assert_eq!(up.set_liquidity_delta_sign(&delta), dec("10"));
    }

    #[test]
    fn rejects_bad_fees_and_limits() {
        assert!(matches!(
            SwapStrategy::new(SwapDirection::ZeroForOne, dec("-0.01"), None),
            Err(RouterError::InvariantViolation(_))
        ));
        assert!(matches!(
            SwapStrategy::new(SwapDirection::ZeroForOne, Dec::one(), None),
            Err(RouterError::Range(_))
        ));
        let strategy =
            SwapStrategy::new(SwapDirection::ZeroForOne, Dec::zero(), Some(dec("80"))).unwrap();
        assert!(strategy.validate_sqrt_price_limit(&dec("70")).is_err());
    }

    #[test]
    fn step_clamps_at_target_and_charges_fee_on_consumed_amount() {
        let liquidity = dec("1517882343.751510418088349649");
        let current = dec("70.710678118654752440");
        let target = tick_to_sqrt_price(315_000, -4).unwrap();
        let fee = dec("0.002");
        let strategy = SwapStrategy::new(SwapDirection::OneForZero, fee.clone(), None).unwrap();

        let step = strategy
            .compute_swap_step_out_given_in(&current, &target, &liquidity, &dec("6000000000"))
            .unwrap();
        assert_eq!(step.sqrt_price_next, target);
        let expected_fee = compute_fee_charge_from_amount_in(&step.amount_in, &fee).unwrap();
        assert_eq!(step.fee_charge, expected_fee);
        assert!(step.amount_in + &step.fee_charge <= dec("6000000000"));
    }

    #[test]
    fn step_short_of_target_charges_leftover_as_fee() {
        let liquidity = dec("1517882343.751510418088349649");
        let current = dec("70.710678118654752440");
        let target = tick_to_sqrt_price(315_000, -4).unwrap();
        let strategy =
            SwapStrategy::new(SwapDirection::OneForZero, dec("0.01"), None).unwrap();

        let remaining = dec("42000000");
        let step = strategy
            .compute_swap_step_out_given_in(&current, &target, &liquidity, &remaining)
            .unwrap();
        assert!(step.sqrt_price_next < target);
        assert_eq!(step.amount_in.clone() + &step.fee_charge, remaining);
        assert!(!step.fee_charge.is_negative());
    }

    #[test]
    fn in_given_out_step_reaches_requested_output() {
        let liquidity = dec("1517882343.751510418088349649");
        let current = dec("70.710678118654752440");
        let target = tick_to_sqrt_price(305_450, -4).unwrap();
        let strategy = SwapStrategy::new(SwapDirection::ZeroForOne, Dec::zero(), None).unwrap();

        let step = strategy
            .compute_swap_step_in_given_out(&current, &target, &liquidity, &dec("66808388"))
            .unwrap();
        assert!(step.sqrt_price_next < current);
        assert!(step.sqrt_price_next > target);
        // the price is rounded against the trader, so the output may overshoot by dust
        assert!(step.amount_out >= dec("66808388"));
        assert!(step.amount_out < dec("66808388.000001"));
        assert!(step.fee_charge.is_zero());
        assert_eq!(step.amount_in, dec("13370"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn fee_charge_is_never_negative(
            fee_bps in 0i64..9_900,
            amount in 1u64..10_000_000_000,
            zero_for_one in any::<bool>(),
        ) {
            let liquidity = dec("1517882343.751510418088349649");
            let current = dec("70.710678118654752440");
            let (direction, target_tick) = if zero_for_one {
                (SwapDirection::ZeroForOne, 305_450)
            } else {
                (SwapDirection::OneForZero, 315_000)
            };
            let target = tick_to_sqrt_price(target_tick, -4).unwrap();
            let fee = Dec::from(fee_bps).quo_round(&Dec::from(10_000i64)).unwrap();
            let strategy = SwapStrategy::new(direction, fee, None).unwrap();

            let remaining = Dec::from(amount);
            let step = strategy
                .compute_swap_step_out_given_in(&current, &target, &liquidity, &remaining)
                .unwrap();

            prop_assert!(!step.fee_charge.is_negative());
            if step.sqrt_price_next != target && fee_bps > 0 {
                prop_assert_eq!(step.amount_in + &step.fee_charge, remaining);
            }
        }
    }
}
