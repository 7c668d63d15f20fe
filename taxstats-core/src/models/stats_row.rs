use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{DemographicKey, IncomeYear};

/// Totals for one (year, demographic key, bracket) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub individuals: u64,
    pub income: Decimal,
    pub tax: Decimal,
}

impl GroupAggregate {
    pub fn new(
        individuals: u64,
        income: Decimal,
        tax: Decimal,
    ) -> Self {
        Self {
            individuals,
            income,
            tax,
        }
    }
}

impl AddAssign for GroupAggregate {
    fn add_assign(
        &mut self,
        other: Self,
    ) {
        self.individuals += other.individuals;
        self.income += other.income;
        self.tax += other.tax;
    }
}

impl Add for GroupAggregate {
    type Output = Self;

    fn add(
        mut self,
        other: Self,
    ) -> Self {
        self += other;
        self
    }
}

impl Sum for GroupAggregate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a GroupAggregate> for GroupAggregate {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// One row of the taxpayer statistics table.
///
/// `income_range` is kept as the display label; it is parsed into a
/// [`Bracket`](crate::Bracket) only where bounds are needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRow {
    pub year: IncomeYear,
    pub key: DemographicKey,
    pub income_range: String,
    pub totals: GroupAggregate,
}

impl StatsRow {
    pub fn new(
        year: IncomeYear,
        key: DemographicKey,
        income_range: impl Into<String>,
        totals: GroupAggregate,
    ) -> Self {
        Self {
            year,
            key,
            income_range: income_range.into(),
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn aggregates_add_field_by_field() {
        let mut total = GroupAggregate::new(10, dec!(1000.50), dec!(100));
        total += GroupAggregate::new(5, dec!(499.50), dec!(50.25));

        assert_eq!(total, GroupAggregate::new(15, dec!(1500.00), dec!(150.25)));
    }

    #[test]
    fn aggregates_sum_over_references() {
        let parts = [
            GroupAggregate::new(1, dec!(1), dec!(0)),
            GroupAggregate::new(2, dec!(2), dec!(1)),
            GroupAggregate::new(3, dec!(3), dec!(2)),
        ];

        let total: GroupAggregate = parts.iter().sum();

        assert_eq!(total, GroupAggregate::new(6, dec!(6), dec!(3)));
    }

    #[test]
    fn empty_sum_is_zero() {
        let total: GroupAggregate = Vec::<GroupAggregate>::new().into_iter().sum();

        assert_eq!(total, GroupAggregate::default());
    }
}
