/*
 * Utility functions and helpers
 */

use crate::math::decimal::Dec;
use crate::models::{Result, RouterError};

/// Relative deviation of the effective price from the spot price:
/// `effective / spot - 1`.
pub fn calculate_price_impact(effective_price: &Dec, spot_price: &Dec) -> Result<Dec> {
    if spot_price.is_zero() {
        return Ok(Dec::zero());
    }
    Ok(effective_price.quo_round(spot_price)? - Dec::one())
}

/// Checks that a pool holding `pool_denoms` can swap `token_in` for `token_out`.
pub fn validate_denoms(
    pool_id: &str,
    pool_denoms: &[String],
    token_in: &str,
    token_out: &str,
) -> Result<()> {
    let holds = |denom: &str| pool_denoms.iter().any(|d| d == denom);
    if token_in == token_out || !holds(token_in) || !holds(token_out) {
        return Err(RouterError::InvalidDenoms {
            pool_id: pool_id.to_string(),
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
        });
    }
    Ok(())
}

/// Serializes a `BigInt` as a decimal string so JSON consumers keep full precision.
pub mod bigint_string {
    use num_bigint::BigInt;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| D::Error::custom(format!("invalid integer {raw}: {e}")))
    }
}
