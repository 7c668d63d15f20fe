use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::IncomeYear;

/// Errors raised while building or querying an [`InflationTable`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InflationError {
    #[error("inflation multiplier for {year} must be positive, got {multiplier}")]
    NonPositiveMultiplier {
        year: IncomeYear,
        multiplier: Decimal,
    },

    #[error("reference year {0} has no inflation multiplier")]
    MissingReferenceYear(IncomeYear),

    #[error("reference year {year} must have multiplier 1, got {multiplier}")]
    ReferenceYearNotUnity {
        year: IncomeYear,
        multiplier: Decimal,
    },

    #[error("no inflation multiplier for income year {0}")]
    UnknownYear(IncomeYear),
}

/// Multipliers converting each year's nominal dollars into reference-year
/// dollars.
///
/// Deserialized tables go through the same checks as [`InflationTable::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedInflationTable")]
pub struct InflationTable {
    reference_year: IncomeYear,
    factors: BTreeMap<IncomeYear, Decimal>,
}

#[derive(Deserialize)]
struct UncheckedInflationTable {
    reference_year: IncomeYear,
    factors: BTreeMap<IncomeYear, Decimal>,
}

impl TryFrom<UncheckedInflationTable> for InflationTable {
    type Error = InflationError;

    fn try_from(table: UncheckedInflationTable) -> Result<Self, Self::Error> {
        Self::new(table.reference_year, table.factors)
    }
}

/// Built-in multipliers, relative to 2022–23, in hundredths.
const REFERENCE_FACTORS: [(&str, i64); 13] = [
    ("2010–11", 134),
    ("2011–12", 131),
    ("2012–13", 128),
    ("2013–14", 125),
    ("2014–15", 123),
    ("2015–16", 121),
    ("2016–17", 119),
    ("2017–18", 117),
    ("2018–19", 115),
    ("2019–20", 114),
    ("2020–21", 112),
    ("2021–22", 107),
    ("2022–23", 100),
];

impl InflationTable {
    /// Builds a table after checking every multiplier is positive and the
    /// reference year maps to exactly 1.
    pub fn new(
        reference_year: IncomeYear,
        factors: BTreeMap<IncomeYear, Decimal>,
    ) -> Result<Self, InflationError> {
        if let Some((year, multiplier)) = factors.iter().find(|(_, m)| **m <= Decimal::ZERO) {
            return Err(InflationError::NonPositiveMultiplier {
                year: year.clone(),
                multiplier: *multiplier,
            });
        }

        match factors.get(&reference_year) {
            None => return Err(InflationError::MissingReferenceYear(reference_year)),
            Some(m) if *m != Decimal::ONE => {
                return Err(InflationError::ReferenceYearNotUnity {
                    year: reference_year,
                    multiplier: *m,
                });
            }
            Some(_) => {}
        }

        Ok(Self {
            reference_year,
            factors,
        })
    }

    /// The 2010–11 to 2022–23 table, in 2022–23 dollars.
    pub fn reference() -> Self {
        let factors = REFERENCE_FACTORS
            .iter()
            .map(|(year, hundredths)| (IncomeYear::new(year), Decimal::new(*hundredths, 2)))
            .collect();

        Self {
            reference_year: IncomeYear::new("2022–23"),
            factors,
        }
    }

    pub fn reference_year(&self) -> &IncomeYear {
        &self.reference_year
    }

    pub fn multiplier(
        &self,
        year: &IncomeYear,
    ) -> Option<Decimal> {
        self.factors.get(year).copied()
    }

    /// Like [`multiplier`](Self::multiplier) but an unknown year is an error.
    pub fn require(
        &self,
        year: &IncomeYear,
    ) -> Result<Decimal, InflationError> {
        self.multiplier(year)
            .ok_or_else(|| InflationError::UnknownYear(year.clone()))
    }

    /// Years in chronological order.
    pub fn years(&self) -> impl Iterator<Item = &IncomeYear> {
        self.factors.keys()
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl Default for InflationTable {
    fn default() -> Self {
        Self::reference()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn factors(entries: &[(&str, Decimal)]) -> BTreeMap<IncomeYear, Decimal> {
        entries
            .iter()
            .map(|(year, m)| (IncomeYear::new(year), *m))
            .collect()
    }

    #[test]
    fn reference_table_covers_thirteen_years() {
        let table = InflationTable::reference();

        assert_eq!(table.len(), 13);
        assert_eq!(table.reference_year().as_str(), "2022–23");
        assert_eq!(table.multiplier(&IncomeYear::new("2010–11")), Some(dec!(1.34)));
        assert_eq!(table.multiplier(&IncomeYear::new("2022–23")), Some(dec!(1.00)));
    }

    #[test]
    fn lookup_accepts_hyphenated_year() {
        let table = InflationTable::reference();

        assert_eq!(table.multiplier(&IncomeYear::new("2016-17")), Some(dec!(1.19)));
    }

    #[test]
    fn reference_table_years_are_chronological() {
        let table = InflationTable::reference();
        let first = table.years().next().unwrap();
        let last = table.years().last().unwrap();

        assert_eq!(first.as_str(), "2010–11");
        assert_eq!(last.as_str(), "2022–23");
    }

    #[test]
    fn require_reports_unknown_year() {
        let table = InflationTable::reference();

        let err = table.require(&IncomeYear::new("2030–31")).unwrap_err();

        assert_eq!(err, InflationError::UnknownYear(IncomeYear::new("2030–31")));
    }

    #[test]
    fn new_rejects_non_positive_multiplier() {
        let result = InflationTable::new(
            IncomeYear::new("2022–23"),
            factors(&[("2021–22", dec!(0)), ("2022–23", dec!(1))]),
        );

        assert!(matches!(
            result,
            Err(InflationError::NonPositiveMultiplier { .. })
        ));
    }

    #[test]
    fn new_requires_reference_year() {
        let result = InflationTable::new(
            IncomeYear::new("2022–23"),
            factors(&[("2021–22", dec!(1.07))]),
        );

        assert_eq!(
            result.unwrap_err(),
            InflationError::MissingReferenceYear(IncomeYear::new("2022–23"))
        );
    }

    #[test]
    fn new_requires_unity_reference_multiplier() {
        let result = InflationTable::new(
            IncomeYear::new("2022–23"),
            factors(&[("2022–23", dec!(1.02))]),
        );

        assert!(matches!(
            result,
            Err(InflationError::ReferenceYearNotUnity { .. })
        ));
    }

    #[test]
    fn new_accepts_valid_table() {
        let table = InflationTable::new(
            IncomeYear::new("2022-23"),
            factors(&[("2021-22", dec!(1.07)), ("2022-23", dec!(1.0))]),
        )
        .unwrap();

        assert_eq!(table.len(), 2);
    }

    #[test]
    fn deserialize_accepts_valid_table() {
        let table: InflationTable = toml::from_str(
            r#"
            reference_year = "2022–23"

            [factors]
            "2021–22" = 1.07
            "2022–23" = 1
            "#,
        )
        .unwrap();

        assert_eq!(table.multiplier(&IncomeYear::new("2021–22")), Some(dec!(1.07)));
    }

    #[test]
    fn deserialize_runs_the_same_checks_as_new() {
        let result: Result<InflationTable, _> = toml::from_str(
            r#"
            reference_year = "2022–23"

            [factors]
            "2021–22" = -1.07
            "2022–23" = 1
            "#,
        );

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("must be positive"),
            "got: {err}"
        );
    }
}
