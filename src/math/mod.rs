/*
 * Fixed-point and AMM curve math
 */

pub mod concentrated;
pub mod constant_product;
pub mod decimal;
pub mod quotes;
pub mod swap_strategy;
pub mod tick;

pub use decimal::{BigDec, Dec, DecimalError};
pub use quotes::{calc_in_given_out, calc_out_given_in, PoolSwapState, SimulatedSwap};
pub use swap_strategy::{SwapDirection, SwapStrategy};
