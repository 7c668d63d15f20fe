//! Interval overlap under a uniform-distribution assumption.
//!
//! A source bracket's population is assumed to be spread evenly across its
//! width, so the share that lands in a target bracket is the share of the
//! width the two intervals have in common.

use rust_decimal::Decimal;

use crate::models::BracketBounds;

/// A finite half-open interval `[min, max)` in currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: Decimal,
    pub max: Decimal,
}

impl Span {
    pub fn new(
        min: Decimal,
        max: Decimal,
    ) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> Decimal {
        self.max - self.min
    }

    /// Both ends multiplied by `factor`, or `None` on overflow.
    pub fn scaled(
        &self,
        factor: Decimal,
    ) -> Option<Self> {
        Some(Self::new(
            self.min.checked_mul(factor)?,
            self.max.checked_mul(factor)?,
        ))
    }
}

/// Fraction of `source`'s width that lies inside `target`, in `[0, 1]`.
///
/// Returns exactly zero for an empty source and when the intervals only
/// touch at a boundary or are disjoint.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use taxstats_core::BracketBounds;
/// use taxstats_core::calculations::{Span, overlap_fraction};
///
/// let source = Span::new(dec!(0), dec!(100));
/// let target = BracketBounds::bounded(dec!(50), dec!(150));
///
/// assert_eq!(overlap_fraction(source, &target), dec!(0.5));
/// ```
pub fn overlap_fraction(
    source: Span,
    target: &BracketBounds,
) -> Decimal {
    let width = source.width();
    if width <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let below = source.max <= target.min;
    let above = target.max.is_some_and(|max| source.min >= max);
    if below || above {
        return Decimal::ZERO;
    }

    let upper = target.max.map_or(source.max, |max| source.max.min(max));
    let lower = source.min.max(target.min);

    (upper - lower) / width
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn span(
        min: Decimal,
        max: Decimal,
    ) -> Span {
        Span::new(min, max)
    }

    #[test]
    fn half_overlap_is_exactly_one_half() {
        let fraction = overlap_fraction(
            span(dec!(0), dec!(100)),
            &BracketBounds::bounded(dec!(50), dec!(150)),
        );

        assert_eq!(fraction, dec!(0.5));
    }

    #[test]
    fn touching_boundary_is_no_overlap() {
        let fraction = overlap_fraction(
            span(dec!(0), dec!(50)),
            &BracketBounds::bounded(dec!(50), dec!(100)),
        );

        assert_eq!(fraction, Decimal::ZERO);
    }

    #[test]
    fn touching_boundary_from_above_is_no_overlap() {
        let fraction = overlap_fraction(
            span(dec!(100), dec!(150)),
            &BracketBounds::bounded(dec!(50), dec!(100)),
        );

        assert_eq!(fraction, Decimal::ZERO);
    }

    #[test]
    fn full_containment_is_one() {
        let fraction = overlap_fraction(
            span(dec!(10), dec!(20)),
            &BracketBounds::bounded(dec!(0), dec!(100)),
        );

        assert_eq!(fraction, Decimal::ONE);
    }

    #[test]
    fn target_inside_source_is_width_ratio() {
        let fraction = overlap_fraction(
            span(dec!(0), dec!(100)),
            &BracketBounds::bounded(dec!(20), dec!(30)),
        );

        assert_eq!(fraction, dec!(0.1));
    }

    #[test]
    fn zero_width_source_is_zero() {
        let fraction = overlap_fraction(
            span(dec!(40), dec!(40)),
            &BracketBounds::bounded(dec!(0), dec!(100)),
        );

        assert_eq!(fraction, Decimal::ZERO);
    }

    #[test]
    fn unbounded_target_takes_everything_above_its_min() {
        let target = BracketBounds::at_least(dec!(1000000));

        assert_eq!(
            overlap_fraction(span(dec!(1500000), dec!(2000000)), &target),
            Decimal::ONE
        );
        assert_eq!(
            overlap_fraction(span(dec!(500000), dec!(1500000)), &target),
            dec!(0.5)
        );
        assert_eq!(
            overlap_fraction(span(dec!(0), dec!(1000000)), &target),
            Decimal::ZERO
        );
    }

    #[test]
    fn fractions_over_a_partition_sum_to_one() {
        let source = span(dec!(37501.25), dec!(50000));
        let targets = [
            BracketBounds::bounded(dec!(30000), dec!(40000)),
            BracketBounds::bounded(dec!(40000), dec!(50000)),
            BracketBounds::at_least(dec!(50000)),
        ];

        let total: Decimal = targets.iter().map(|t| overlap_fraction(source, t)).sum();

        assert!((total - Decimal::ONE).abs() < dec!(0.000000000001));
    }

    #[test]
    fn scaled_span_multiplies_both_ends() {
        let scaled = span(dec!(30001), dec!(40000)).scaled(dec!(1.25));

        assert_eq!(scaled, Some(span(dec!(37501.25), dec!(50000))));
    }

    #[test]
    fn scaling_past_decimal_range_is_none() {
        let huge = span(dec!(1000001), Decimal::MAX);

        assert_eq!(huge.scaled(dec!(1.34)), None);
    }
}
