//! Common utility functions for bracket calculations.
//!
//! This module provides the rounding and comparison helpers shared by the
//! redistributor, the verifier and the CSV writer.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a currency amount to exactly two decimal places using half-up rounding.
///
/// Values at exactly 0.005 are rounded away from zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use taxstats_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a fractional head count to the nearest whole person.
///
/// Ties go to the even neighbour so that a run of `x.5` shares does not
/// drift consistently upward. Negative input clamps to zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use taxstats_core::calculations::common::round_count;
///
/// assert_eq!(round_count(dec!(249.6)), 250);
/// assert_eq!(round_count(dec!(2.5)), 2);
/// assert_eq!(round_count(dec!(3.5)), 4);
/// ```
pub fn round_count(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_u64()
        .unwrap_or(0)
}

/// Relative difference `|actual - expected| / expected`.
///
/// When `expected` is zero the result is zero if `actual` is also zero and
/// one (100%) otherwise.
pub fn relative_difference(
    actual: Decimal,
    expected: Decimal,
) -> Decimal {
    if expected.is_zero() {
        return if actual.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE
        };
    }
    ((actual - expected) / expected).abs()
}
