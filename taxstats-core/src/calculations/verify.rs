//! Integrity checks comparing a source table with its redistribution.
//!
//! For every year the verifier checks that
//!
//! * the number of individuals is unchanged, up to per-row rounding
//!   ([`Tolerances::individuals`], 0.1% by default), and
//! * total income equals the source income times the year's multiplier
//!   ([`Tolerances::income`], 0.01% by default).
//!
//! Tax is reported as an informational change only, since moving people
//! between brackets is expected to change it.
//!
//! Failures are collected into the [`VerificationReport`]; verification
//! never stops at the first bad year.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calculations::common::relative_difference;
use crate::models::{GroupAggregate, IncomeYear, InflationTable, StatsRow, TargetBrackets};

/// Relative tolerances for the two checked metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Allowed relative drift of the individual count (0.001 = 0.1%).
    pub individuals: Decimal,
    /// Allowed relative error of inflated income (0.0001 = 0.01%).
    pub income: Decimal,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            individuals: Decimal::new(1, 3),
            income: Decimal::new(1, 4),
        }
    }
}

/// The metric a check or violation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrityMetric {
    Individuals,
    Income,
}

impl fmt::Display for IntegrityMetric {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Individuals => f.write_str("individuals"),
            Self::Income => f.write_str("income"),
        }
    }
}

/// Expected versus actual total for one metric in one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCheck {
    pub expected: Decimal,
    pub actual: Decimal,
    pub relative_difference: Decimal,
    pub tolerance: Decimal,
}

impl MetricCheck {
    pub fn new(
        expected: Decimal,
        actual: Decimal,
        tolerance: Decimal,
    ) -> Self {
        Self {
            expected,
            actual,
            relative_difference: relative_difference(actual, expected),
            tolerance,
        }
    }

    /// Signed difference `actual - expected`.
    pub fn difference(&self) -> Decimal {
        self.actual - self.expected
    }

    pub fn passed(&self) -> bool {
        self.relative_difference < self.tolerance
    }
}

/// How much redistributed tax differs from the simply inflated source tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxChange {
    pub inflated_original: Decimal,
    pub redistributed: Decimal,
}

impl TaxChange {
    pub fn change(&self) -> Decimal {
        self.redistributed - self.inflated_original
    }

    /// Change relative to the inflated source tax; zero when there was none.
    pub fn relative_change(&self) -> Decimal {
        if self.inflated_original.is_zero() {
            return Decimal::ZERO;
        }
        self.change() / self.inflated_original
    }
}

/// Verification outcome for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearVerification {
    pub year: IncomeYear,
    /// `None` when the year is missing from the inflation table.
    pub multiplier: Option<Decimal>,
    pub individuals: MetricCheck,
    /// Skipped (`None`) when the multiplier is unknown.
    pub income: Option<MetricCheck>,
    pub tax: Option<TaxChange>,
}

impl YearVerification {
    pub fn passed(&self) -> bool {
        self.multiplier.is_some()
            && self.individuals.passed()
            && self.income.as_ref().is_some_and(MetricCheck::passed)
    }

    pub fn violations(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        if self.multiplier.is_none() {
            violations.push(IntegrityViolation::MissingInflationFactor {
                year: self.year.clone(),
            });
        }

        let checks = [
            (IntegrityMetric::Individuals, Some(self.individuals)),
            (IntegrityMetric::Income, self.income),
        ];
        for (metric, check) in checks {
            if let Some(check) = check.filter(|c| !c.passed()) {
                violations.push(IntegrityViolation::OutOfTolerance {
                    year: self.year.clone(),
                    metric,
                    check,
                });
            }
        }

        violations
    }
}

/// A failed integrity check. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityViolation {
    MissingInflationFactor {
        year: IncomeYear,
    },
    OutOfTolerance {
        year: IncomeYear,
        metric: IntegrityMetric,
        check: MetricCheck,
    },
}

impl IntegrityViolation {
    pub fn year(&self) -> &IncomeYear {
        match self {
            Self::MissingInflationFactor { year } | Self::OutOfTolerance { year, .. } => year,
        }
    }
}

impl fmt::Display for IntegrityViolation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::MissingInflationFactor { year } => {
                write!(f, "{year}: no inflation multiplier, income not checked")
            }
            Self::OutOfTolerance {
                year,
                metric,
                check,
            } => write!(
                f,
                "{year}: {metric} off by {:.4}% (expected {:.2}, got {:.2}, tolerance {:.4}%)",
                check.relative_difference * Decimal::ONE_HUNDRED,
                check.expected,
                check.actual,
                check.tolerance * Decimal::ONE_HUNDRED,
            ),
        }
    }
}

/// Per-year results of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub years: Vec<YearVerification>,
}

impl VerificationReport {
    pub fn violations(&self) -> Vec<IntegrityViolation> {
        self.years.iter().flat_map(YearVerification::violations).collect()
    }

    pub fn is_valid(&self) -> bool {
        self.years.iter().all(YearVerification::passed)
    }

    pub fn year(
        &self,
        year: &IncomeYear,
    ) -> Option<&YearVerification> {
        self.years.iter().find(|y| &y.year == year)
    }
}

/// Checks redistributed tables against their sources.
#[derive(Debug, Clone, Default)]
pub struct IntegrityVerifier {
    tolerances: Tolerances,
}

impl IntegrityVerifier {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Verifies every year present in either table.
    pub fn verify(
        &self,
        original: &[StatsRow],
        redistributed: &[StatsRow],
        inflation: &InflationTable,
    ) -> VerificationReport {
        let before = totals_by_year(original);
        let after = totals_by_year(redistributed);
        let years: BTreeSet<&IncomeYear> =
            before.keys().chain(after.keys()).copied().collect();

        let report = VerificationReport {
            years: years
                .into_iter()
                .map(|year| {
                    let source = before.get(year).copied().unwrap_or_default();
                    let result = after.get(year).copied().unwrap_or_default();
                    self.verify_year(year, source, result, inflation.multiplier(year))
                })
                .collect(),
        };

        for violation in report.violations() {
            warn!(%violation, "integrity violation");
        }
        info!(
            years = report.years.len(),
            valid = report.is_valid(),
            "verification complete"
        );

        report
    }

    fn verify_year(
        &self,
        year: &IncomeYear,
        source: GroupAggregate,
        result: GroupAggregate,
        multiplier: Option<Decimal>,
    ) -> YearVerification {
        let individuals = MetricCheck::new(
            Decimal::from(source.individuals),
            Decimal::from(result.individuals),
            self.tolerances.individuals,
        );
        let income = multiplier
            .map(|m| MetricCheck::new(source.income * m, result.income, self.tolerances.income));
        let tax = multiplier.map(|m| TaxChange {
            inflated_original: source.tax * m,
            redistributed: result.tax,
        });

        debug!(
            %year,
            individuals_drift = %individuals.relative_difference,
            income_drift = ?income.map(|c| c.relative_difference),
            "verified year"
        );

        YearVerification {
            year: year.clone(),
            multiplier,
            individuals,
            income,
            tax,
        }
    }
}

/// Individuals per bracket in one year, before and after redistribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketShift {
    pub income_range: String,
    pub original: u64,
    pub redistributed: u64,
}

impl BracketShift {
    pub fn change(&self) -> i128 {
        i128::from(self.redistributed) - i128::from(self.original)
    }
}

/// Compares the bracket distribution of one year across the two tables.
///
/// Every label present in either table appears once, ordered by its rank in
/// `order` (unknown labels last, alphabetically).
pub fn bracket_distribution(
    original: &[StatsRow],
    redistributed: &[StatsRow],
    year: &IncomeYear,
    order: &TargetBrackets,
) -> Vec<BracketShift> {
    let mut shifts: BTreeMap<(usize, String), BracketShift> = BTreeMap::new();

    let mut tally = |rows: &[StatsRow], after: bool| {
        for row in rows.iter().filter(|r| &r.year == year) {
            let rank = order.position(&row.income_range).unwrap_or(usize::MAX);
            let shift = shifts
                .entry((rank, row.income_range.clone()))
                .or_insert_with(|| BracketShift {
                    income_range: row.income_range.clone(),
                    original: 0,
                    redistributed: 0,
                });
            if after {
                shift.redistributed += row.totals.individuals;
            } else {
                shift.original += row.totals.individuals;
            }
        }
    };
    tally(original, false);
    tally(redistributed, true);

    shifts.into_values().collect()
}

fn totals_by_year(rows: &[StatsRow]) -> BTreeMap<&IncomeYear, GroupAggregate> {
    let mut totals: BTreeMap<&IncomeYear, GroupAggregate> = BTreeMap::new();
    for row in rows {
        *totals.entry(&row.year).or_default() += row.totals;
    }
    totals
}
