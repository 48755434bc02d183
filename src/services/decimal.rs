//! Bounded-precision decimal conversion for audit values.
//!
//! Floats are converted through their shortest round-trip representation and
//! then rounded to a fixed number of significant digits, so a value like
//! 1.23456789e-7 keeps all of its digits instead of collapsing to zero.

use bigdecimal::BigDecimal;
use std::str::FromStr;
use std::time::Duration;

/// Smallest non-zero magnitude the record store accepts
pub const MIN_MAGNITUDE: f64 = 1e-130;

/// Magnitudes at or above this are rejected by the record store
pub const MAX_MAGNITUDE: f64 = 1e126;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecimalError {
    #[error("value {0} is not finite")]
    NonFinite(f64),

    #[error("value {0:e} is outside the representable decimal range")]
    OutOfRange(f64),

    #[error("value {0} could not be parsed as a decimal")]
    Unparsable(f64),
}

/// Decimal used when a value cannot be represented
pub fn sentinel() -> BigDecimal {
    BigDecimal::from_str("0.0").unwrap_or_default()
}

/// Converts `value` into a decimal rounded to `precision` significant digits.
pub fn to_bounded_decimal(value: f64, precision: u64) -> Result<BigDecimal, DecimalError> {
    if !value.is_finite() {
        return Err(DecimalError::NonFinite(value));
    }
    if value == 0.0 {
        return Ok(sentinel());
    }
    let magnitude = value.abs();
    if !(MIN_MAGNITUDE..MAX_MAGNITUDE).contains(&magnitude) {
        return Err(DecimalError::OutOfRange(value));
    }

    // f64 Display never uses exponent notation and round-trips exactly
    let exact = BigDecimal::from_str(&value.to_string()).map_err(|_| DecimalError::Unparsable(value))?;
    Ok(exact.with_prec(precision))
}

/// Like [`to_bounded_decimal`] but falls back to the sentinel on failure.
pub fn to_bounded_decimal_or_sentinel(value: f64, precision: u64, field: &str) -> BigDecimal {
    match to_bounded_decimal(value, precision) {
        Ok(decimal) => decimal,
        Err(e) => {
            tracing::error!(field = field, error = %e, "Decimal conversion failed, logging sentinel");
            sentinel()
        }
    }
}

/// Elapsed time in seconds as a bounded-precision decimal.
pub fn latency_decimal(elapsed: Duration, precision: u64) -> BigDecimal {
    to_bounded_decimal_or_sentinel(elapsed.as_secs_f64(), precision, "latency")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero() -> BigDecimal {
        BigDecimal::from(0)
    }

    #[test]
    fn test_tiny_latency_keeps_its_digits() {
        let decimal = to_bounded_decimal(0.000000123456789, 15).unwrap();
        assert_ne!(decimal, zero());
        assert_eq!(decimal, BigDecimal::from_str("0.000000123456789").unwrap());
    }

    #[test]
    fn test_tiny_latency_from_duration() {
        let decimal = latency_decimal(Duration::from_nanos(123), 15);
        assert_eq!(decimal, BigDecimal::from_str("0.000000123").unwrap());
    }

    #[test]
    fn test_precision_bounds_significant_digits() {
        let decimal = to_bounded_decimal(1.0 / 3.0, 15).unwrap();
        assert_eq!(decimal, BigDecimal::from_str("0.333333333333333").unwrap());
        assert_eq!(decimal.digits(), 15);
    }

    #[test]
    fn test_ordinary_rating() {
        let decimal = to_bounded_decimal(4.5, 15).unwrap();
        assert_eq!(decimal, BigDecimal::from_str("4.5").unwrap());

        let negative = to_bounded_decimal(-0.25, 15).unwrap();
        assert_eq!(negative, BigDecimal::from_str("-0.25").unwrap());
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        assert!(matches!(
            to_bounded_decimal(f64::NAN, 15),
            Err(DecimalError::NonFinite(_))
        ));
        assert!(matches!(
            to_bounded_decimal(f64::INFINITY, 15),
            Err(DecimalError::NonFinite(_))
        ));
        assert!(matches!(
            to_bounded_decimal(f64::NEG_INFINITY, 15),
            Err(DecimalError::NonFinite(_))
        ));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(matches!(
            to_bounded_decimal(1e200, 15),
            Err(DecimalError::OutOfRange(_))
        ));
        assert!(matches!(
            to_bounded_decimal(-1e-200, 15),
            Err(DecimalError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_fallback_uses_sentinel() {
        assert_eq!(to_bounded_decimal_or_sentinel(f64::NAN, 15, "predicted_rating"), zero());
        assert_eq!(to_bounded_decimal_or_sentinel(1e300, 15, "predicted_rating"), zero());
        assert_eq!(sentinel(), zero());
    }

    #[test]
    fn test_zero_is_the_sentinel_value() {
        assert_eq!(to_bounded_decimal(0.0, 15).unwrap(), zero());
        assert_eq!(to_bounded_decimal(-0.0, 15).unwrap(), zero());
    }
}
