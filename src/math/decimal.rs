/*
 * Fixed-point decimal arithmetic over arbitrary-precision integers
 */

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Iteration cap for [`FixedDecimal::approx_sqrt`].
pub const MAX_APPROX_ROOT_ITERATIONS: usize = 300;

/// Largest mantissa representable by `rust_decimal::Decimal` (2^96 - 1).
const RUST_DECIMAL_MAX_MANTISSA: i128 = 79_228_162_514_264_337_593_543_950_335;
const RUST_DECIMAL_MAX_SCALE: u32 = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid decimal string: {0}")]
    Parse(String),

    #[error("too many fractional digits in {value}: max {max}")]
    TooPrecise { value: String, max: u32 },
}

/// Signed fixed-point number with `PRECISION` fractional digits.
///
/// The value is stored as `raw / 10^PRECISION`. Multiplication and division
/// never round implicitly: every call site picks a rounding discipline
/// (`*_round` is half-to-even, `*_truncate` is toward zero, `*_round_up` is
/// toward positive infinity).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FixedDecimal<const PRECISION: u32> {
    raw: BigInt,
}

/// 18 decimal places, used for amounts, prices and liquidity.
pub type Dec = FixedDecimal<18>;

/// 36 decimal places, used as an extended-precision accumulator.
pub type BigDec = FixedDecimal<36>;

fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// Drops `PRECISION` digits, rounding half to even.
fn chop_round(value: &BigInt, precision: u32) -> BigInt {
    let scale = pow10(precision);
    let abs = value.abs();
    let quotient = &abs / &scale;
    let remainder = &abs % &scale;

    let doubled = remainder * 2u8;
    let rounded = match doubled.cmp(&scale) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + 1u8,
        Ordering::Equal => {
            if (&quotient % 2u8).is_zero() {
                quotient
            } else {
                quotient + 1u8
            }
        }
    };

    if value.is_negative() {
        -rounded
    } else {
        rounded
    }
}

/// Integer division rounding toward positive infinity.
fn div_ceil(numerator: &BigInt, denominator: &BigInt) -> BigInt {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let positive_result = numerator.sign() == denominator.sign();
    if !remainder.is_zero() && positive_result {
        quotient + 1u8
    } else {
        quotient
    }
}

impl<const PRECISION: u32> FixedDecimal<PRECISION> {
    /// Wraps an already-scaled integer.
    #[must_use]
    pub fn from_raw(raw: BigInt) -> Self {
        Self { raw }
    }

    #[must_use]
    pub fn raw(&self) -> &BigInt {
        &self.raw
    }

    #[must_use]
    pub fn from_int(value: impl Into<BigInt>) -> Self {
        Self {
            raw: value.into() * Self::scale(),
        }
    }

    #[must_use]
    pub fn zero() -> Self {
        Self { raw: BigInt::zero() }
    }

    #[must_use]
    pub fn one() -> Self {
        Self { raw: Self::scale() }
    }

    /// Smallest positive representable value, `10^-PRECISION`.
    #[must_use]
    pub fn smallest() -> Self {
        Self { raw: BigInt::one() }
    }

    #[must_use]
    pub fn scale() -> BigInt {
        pow10(PRECISION)
    }

    /// `10^exponent`. Negative exponents below `-PRECISION` collapse to zero.
    #[must_use]
    pub fn pow10(exponent: i64) -> Self {
        if exponent >= 0 {
            return Self::from_int(pow10(exponent.unsigned_abs() as u32));
        }
        let digits = exponent.unsigned_abs();
        if digits > u64::from(PRECISION) {
            return Self::zero();
        }
        Self {
            raw: pow10(PRECISION - digits as u32),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.raw.is_negative()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.raw.is_positive()
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        Self {
            raw: self.raw.abs(),
        }
    }

    #[must_use]
    pub fn mul_round(&self, other: &Self) -> Self {
        Self {
            raw: chop_round(&(&self.raw * &other.raw), PRECISION),
        }
    }

    #[must_use]
    pub fn mul_truncate(&self, other: &Self) -> Self {
        Self {
            raw: (&self.raw * &other.raw) / Self::scale(),
        }
    }

    #[must_use]
    pub fn mul_round_up(&self, other: &Self) -> Self {
        Self {
            raw: div_ceil(&(&self.raw * &other.raw), &Self::scale()),
        }
    }

    pub fn quo_round(&self, other: &Self) -> Result<Self, DecimalError> {
        if other.is_zero() {
            return Err(DecimalError::DivisionByZero);
        }
        let scale = Self::scale();
        let widened = &self.raw * &scale * &scale;
        Ok(Self {
            raw: chop_round(&(widened / &other.raw), PRECISION),
        })
    }

    pub fn quo_truncate(&self, other: &Self) -> Result<Self, DecimalError> {
        if other.is_zero() {
            return Err(DecimalError::DivisionByZero);
        }
        Ok(Self {
            raw: (&self.raw * Self::scale()) / &other.raw,
        })
    }

    pub fn quo_round_up(&self, other: &Self) -> Result<Self, DecimalError> {
        if other.is_zero() {
            return Err(DecimalError::DivisionByZero);
        }
        Ok(Self {
            raw: div_ceil(&(&self.raw * Self::scale()), &other.raw),
        })
    }

    /// Integer part, truncated toward zero.
    #[must_use]
    pub fn truncate(&self) -> BigInt {
        &self.raw / Self::scale()
    }

    /// Integer part, rounded toward positive infinity.
    #[must_use]
    pub fn round_up_int(&self) -> BigInt {
        div_ceil(&self.raw, &Self::scale())
    }

    /// Integer part, rounded toward negative infinity.
    #[must_use]
    pub fn floor_int(&self) -> BigInt {
        -div_ceil(&-&self.raw, &Self::scale())
    }

    #[must_use]
    pub fn truncate_dec(&self) -> Self {
        Self::from_int(self.truncate())
    }

    #[must_use]
    pub fn ceil(&self) -> Self {
        Self::from_int(self.round_up_int())
    }

    /// Exponentiation by squaring, rounding each product half to even.
    #[must_use]
    pub fn pow(&self, power: u32) -> Self {
        if power == 0 {
            return Self::one();
        }
        let mut base = self.clone();
        let mut acc = Self::one();
        let mut remaining = power;
        while remaining > 1 {
            if remaining % 2 != 0 {
                acc = acc.mul_round(&base);
            }
            remaining /= 2;
            base = base.mul_round(&base);
        }
        base.mul_round(&acc)
    }

    /// Square root by Newton's method.
    ///
    /// Stops once the correction is no larger than [`Self::smallest`] or after
    /// [`MAX_APPROX_ROOT_ITERATIONS`] steps. Negative inputs return the
    /// negated root of the absolute value.
    #[must_use]
    pub fn approx_sqrt(&self) -> Self {
        if self.is_negative() {
            return -self.abs().approx_sqrt();
        }
        if self.is_zero() || *self == Self::one() {
            return self.clone();
        }

        let smallest = Self::smallest();
        let two = BigInt::from(2u8);
        let mut guess = Self::one();
        let mut delta = Self::one();
        let mut iterations = 0;
        while delta.abs() > smallest && iterations < MAX_APPROX_ROOT_ITERATIONS {
            let prev = if guess.is_zero() {
                smallest.clone()
            } else {
                guess.clone()
            };
            delta = match self.quo_round(&prev) {
                Ok(quotient) => quotient - &guess,
                Err(_) => break,
            };
            delta = Self {
                raw: &delta.raw / &two,
            };
            guess += &delta;
            iterations += 1;
        }
        guess
    }

    /// Changes precision, truncating toward zero when digits are dropped.
    #[must_use]
    pub fn convert<const TARGET: u32>(&self) -> FixedDecimal<TARGET> {
        let raw = match TARGET.cmp(&PRECISION) {
            Ordering::Equal => self.raw.clone(),
            Ordering::Greater => &self.raw * pow10(TARGET - PRECISION),
            Ordering::Less => &self.raw / pow10(PRECISION - TARGET),
        };
        FixedDecimal { raw }
    }

    /// Lossy conversion for heuristic scoring; saturates when out of range.
    #[must_use]
    pub fn to_decimal_lossy(&self) -> rust_decimal::Decimal {
        let mut raw = self.raw.clone();
        let mut scale = PRECISION;
        let ten = BigInt::from(10u8);
        let max = BigInt::from(RUST_DECIMAL_MAX_MANTISSA);
        while scale > 0 && (scale > RUST_DECIMAL_MAX_SCALE || raw.abs() > max) {
            raw /= &ten;
            scale -= 1;
        }
        match raw.to_i128() {
            Some(mantissa) if mantissa.unsigned_abs() <= RUST_DECIMAL_MAX_MANTISSA as u128 => {
                rust_decimal::Decimal::from_i128_with_scale(mantissa, scale)
            }
            _ if raw.is_negative() => rust_decimal::Decimal::MIN,
            _ => rust_decimal::Decimal::MAX,
        }
    }
}

impl BigDec {
    #[must_use]
    pub fn to_dec(&self) -> Dec {
        self.convert()
    }
}

impl Dec {
    #[must_use]
    pub fn to_big_dec(&self) -> BigDec {
        self.convert()
    }
}

impl<const PRECISION: u32> From<BigInt> for FixedDecimal<PRECISION> {
    fn from(value: BigInt) -> Self {
        Self::from_int(value)
    }
}

impl<const PRECISION: u32> From<&BigInt> for FixedDecimal<PRECISION> {
    fn from(value: &BigInt) -> Self {
        Self::from_int(value.clone())
    }
}

impl<const PRECISION: u32> From<i64> for FixedDecimal<PRECISION> {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl<const PRECISION: u32> From<u64> for FixedDecimal<PRECISION> {
    fn from(value: u64) -> Self {
        Self::from_int(value)
    }
}

impl<const PRECISION: u32> FromStr for FixedDecimal<PRECISION> {
    type Err = DecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (unsigned, ""),
        };

        let valid_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() && fraction.is_empty()
            || !valid_digits(whole)
            || !valid_digits(fraction)
        {
            return Err(DecimalError::Parse(s.to_string()));
        }
        if fraction.len() > PRECISION as usize {
            return Err(DecimalError::TooPrecise {
                value: s.to_string(),
                max: PRECISION,
            });
        }

        let padded = format!("{whole}{fraction:0<width$}", width = PRECISION as usize);
        let raw = BigInt::parse_bytes(padded.as_bytes(), 10)
            .ok_or_else(|| DecimalError::Parse(s.to_string()))?;
        Ok(Self {
            raw: if negative { -raw } else { raw },
        })
    }
}

impl<const PRECISION: u32> fmt::Display for FixedDecimal<PRECISION> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = Self::scale();
        let abs = self.raw.abs();
        let whole = &abs / &scale;
        let fraction = (&abs % &scale).to_string();
        let sign = if self.raw.sign() == Sign::Minus { "-" } else { "" };
        write!(
            f,
            "{sign}{whole}.{fraction:0>width$}",
            width = PRECISION as usize
        )
    }
}

impl<const PRECISION: u32> fmt::Debug for FixedDecimal<PRECISION> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<const PRECISION: u32> Serialize for FixedDecimal<PRECISION> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de, const PRECISION: u32> Deserialize<'de> for FixedDecimal<PRECISION> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<const PRECISION: u32> Add<&FixedDecimal<PRECISION>> for &FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn add(self, rhs: &FixedDecimal<PRECISION>) -> Self::Output {
        FixedDecimal {
            raw: &self.raw + &rhs.raw,
        }
    }
}

impl<const PRECISION: u32> Add<&FixedDecimal<PRECISION>> for FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn add(self, rhs: &FixedDecimal<PRECISION>) -> Self::Output {
        FixedDecimal {
            raw: self.raw + &rhs.raw,
        }
    }
}

impl<const PRECISION: u32> Add for FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn add(self, rhs: FixedDecimal<PRECISION>) -> Self::Output {
        FixedDecimal {
            raw: self.raw + rhs.raw,
        }
    }
}

impl<const PRECISION: u32> Sub<&FixedDecimal<PRECISION>> for &FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn sub(self, rhs: &FixedDecimal<PRECISION>) -> Self::Output {
        FixedDecimal {
            raw: &self.raw - &rhs.raw,
        }
    }
}

impl<const PRECISION: u32> Sub<&FixedDecimal<PRECISION>> for FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn sub(self, rhs: &FixedDecimal<PRECISION>) -> Self::Output {
        FixedDecimal {
            raw: self.raw - &rhs.raw,
        }
    }
}

impl<const PRECISION: u32> Sub for FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn sub(self, rhs: FixedDecimal<PRECISION>) -> Self::Output {
        FixedDecimal {
            raw: self.raw - rhs.raw,
        }
    }
}

impl<const PRECISION: u32> AddAssign<&FixedDecimal<PRECISION>> for FixedDecimal<PRECISION> {
    fn add_assign(&mut self, rhs: &FixedDecimal<PRECISION>) {
        self.raw += &rhs.raw;
    }
}

impl<const PRECISION: u32> SubAssign<&FixedDecimal<PRECISION>> for FixedDecimal<PRECISION> {
    fn sub_assign(&mut self, rhs: &FixedDecimal<PRECISION>) {
        self.raw -= &rhs.raw;
    }
}

impl<const PRECISION: u32> Neg for FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn neg(self) -> Self::Output {
        FixedDecimal { raw: -self.raw }
    }
}

impl<const PRECISION: u32> Neg for &FixedDecimal<PRECISION> {
    type Output = FixedDecimal<PRECISION>;

    fn neg(self) -> Self::Output {
        FixedDecimal {
            raw: -self.raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_prints_full_precision() {
        let value = dec("1517882343.751510418088349649");
        assert_eq!(value.to_string(), "1517882343.751510418088349649");
        assert_eq!(dec("-0.5").to_string(), "-0.500000000000000000");
        assert_eq!(dec("42").to_string(), "42.000000000000000000");
    }

    #[test]
    fn rejects_excess_precision_and_garbage() {
        assert!(matches!(
            "0.0000000000000000001".parse::<Dec>(),
            Err(DecimalError::TooPrecise { .. })
        ));
        assert!("1.2.3".parse::<Dec>().is_err());
        assert!("abc".parse::<Dec>().is_err());
        assert!("".parse::<Dec>().is_err());
    }

    #[test]
    fn mul_rounding_modes() {
        let a = dec("0.000000000000000005");
        let half = dec("0.5");
        // 2.5e-18 rounds to even (2e-18), truncates to 2e-18, rounds up to 3e-18
        assert_eq!(a.mul_round(&half), dec("0.000000000000000002"));
        assert_eq!(a.mul_truncate(&half), dec("0.000000000000000002"));
        assert_eq!(a.mul_round_up(&half), dec("0.000000000000000003"));

        let b = dec("0.000000000000000007");
        // 3.5e-18 rounds to even (4e-18)
        assert_eq!(b.mul_round(&half), dec("0.000000000000000004"));
    }

    #[test]
    fn quo_rounding_modes() {
        let one = Dec::one();
        let three = Dec::from(3i64);
        assert_eq!(one.quo_truncate(&three).unwrap(), dec("0.333333333333333333"));
        assert_eq!(one.quo_round_up(&three).unwrap(), dec("0.333333333333333334"));
        assert_eq!(dec("2").quo_round(&three).unwrap(), dec("0.666666666666666667"));
        assert_eq!(
            one.quo_truncate(&Dec::zero()),
            Err(DecimalError::DivisionByZero)
        );
    }

    #[test]
    fn round_up_goes_toward_positive_infinity() {
        assert_eq!(dec("-1").quo_round_up(&Dec::from(3i64)).unwrap(), dec("-0.333333333333333333"));
        assert_eq!(dec("1.2").round_up_int(), BigInt::from(2));
        assert_eq!(dec("-1.2").round_up_int(), BigInt::from(-1));
        assert_eq!(dec("-1.7").truncate(), BigInt::from(-1));
    }

    #[test]
    fn floor_goes_toward_negative_infinity() {
        assert_eq!(dec("1.7").floor_int(), BigInt::from(1));
        assert_eq!(dec("-1.2").floor_int(), BigInt::from(-2));
        assert_eq!(dec("-3").floor_int(), BigInt::from(-3));
        assert_eq!(Dec::zero().floor_int(), BigInt::from(0));
    }

    #[test]
    fn approx_sqrt_matches_reference_values() {
        assert_eq!(dec("5000").approx_sqrt(), dec("70.710678118654752440"));
        assert_eq!(dec("5500").approx_sqrt(), dec("74.161984870956629487"));
        assert_eq!(dec("0.000000000001").approx_sqrt(), dec("0.000001"));
        assert_eq!(Dec::one().approx_sqrt(), Dec::one());
    }

    #[test]
    fn pow_and_pow10() {
        assert_eq!(dec("1.5").pow(3), dec("3.375"));
        assert_eq!(Dec::pow10(-3), dec("0.001"));
        assert_eq!(Dec::pow10(2), dec("100"));
        assert!(Dec::pow10(-19).is_zero());
        assert_eq!(BigDec::pow10(-19).to_string(), "0.000000000000000000100000000000000000");
    }

    #[test]
    fn precision_conversion_truncates() {
        let big: BigDec = "0.123456789012345678999".parse().unwrap();
        assert_eq!(big.to_dec(), dec("0.123456789012345678"));
        assert_eq!(dec("1.5").to_big_dec().to_dec(), dec("1.5"));
    }

    #[test]
    fn lossy_conversion_to_rust_decimal() {
        let value = dec("1234.5");
        assert_eq!(value.to_decimal_lossy(), rust_decimal::Decimal::new(12345, 1));

        let huge = Dec::pow10(40);
        assert_eq!(huge.to_decimal_lossy(), rust_decimal::Decimal::MAX);
    }

    #[test]
    fn serde_uses_strings() {
        let value = dec("70.5");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"70.500000000000000000\"");
        let back: Dec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
