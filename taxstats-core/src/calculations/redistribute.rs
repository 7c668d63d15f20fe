//! Inflation-adjusted redistribution of bracket totals.
//!
//! Each source row's bracket is scaled into reference-year dollars and its
//! totals are shared out over the target brackets it overlaps:
//!
//! | Field         | Emitted value                                  |
//! |---------------|------------------------------------------------|
//! | individuals   | `round(individuals × fraction)` (not inflated) |
//! | income        | `income × fraction × multiplier`               |
//! | tax           | `tax × fraction × multiplier`                  |
//!
//! Counts are rounded per emitted row, so a year's total can drift from
//! the source total by a few people; [`IntegrityVerifier`] bounds that
//! drift.
//!
//! # Open-ended source brackets
//!
//! An "or more" bracket has no upper bound. For overlap it is treated as
//! ending at [`RedistributionConfig::open_ended_ceiling`] (in the source
//! year's nominal dollars). If the ceiling does not exceed the bracket's
//! lower bound the whole bracket is a point mass at its lower bound and goes
//! entirely into the one target that contains that point.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use taxstats_core::calculations::{RedistributionConfig, Redistributor};
//! use taxstats_core::{DemographicKey, GroupAggregate, IncomeYear, StatsRow, TargetBrackets};
//!
//! let targets = TargetBrackets::reference();
//! let redistributor = Redistributor::new(&targets, RedistributionConfig::default()).unwrap();
//!
//! let row = StatsRow::new(
//!     IncomeYear::new("2013–14"),
//!     DemographicKey::new("Female", "Taxable", "30 - 34"),
//!     "$10,001 to $20,000",
//!     GroupAggregate::new(1000, dec!(15000000), dec!(900000)),
//! );
//!
//! let rows = redistributor.redistribute_row(&row, dec!(1.25)).unwrap();
//! let people: u64 = rows.iter().map(|r| r.totals.individuals).sum();
//!
//! assert_eq!(rows.len(), 2);
//! assert_eq!(people, 1000);
//! ```
//!
//! [`IntegrityVerifier`]: crate::calculations::IntegrityVerifier

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::calculations::common::round_count;
use crate::calculations::overlap::{Span, overlap_fraction};
use crate::models::{
    Bracket, BracketBounds, BracketParseError, DemographicKey, GroupAggregate, IncomeYear,
    InflationTable, StatsRow, TargetBrackets,
};

/// Default finite stand-in for the top of an open-ended source bracket.
pub const DEFAULT_OPEN_ENDED_CEILING: i64 = 2_000_000;

/// Errors that can occur while redistributing rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedistributeError {
    /// The source row's income range label could not be parsed.
    #[error(transparent)]
    Parse(#[from] BracketParseError),

    /// The multiplier for the row's year is zero or negative.
    #[error("inflation multiplier must be positive, got {0}")]
    InvalidMultiplier(Decimal),

    /// The open-ended ceiling is zero or negative.
    #[error("open-ended ceiling must be positive, got {0}")]
    InvalidCeiling(Decimal),

    /// No target bracket contains the given amount.
    #[error("no target bracket contains {0}")]
    Uncovered(Decimal),

    /// Scaling a bound or total by the multiplier left the decimal range.
    #[error("amount {amount} times multiplier {multiplier} is out of range")]
    Overflow { amount: Decimal, multiplier: Decimal },

    /// The row's year is missing from the inflation table.
    #[error("no inflation multiplier for income year {0}")]
    UnknownYear(IncomeYear),

    /// A failure attributed to a 1-based row of the input table.
    #[error("row {row}: {source}")]
    Row {
        row: usize,
        source: Box<RedistributeError>,
    },
}

/// Tunable parameters of the redistribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedistributionConfig {
    /// Upper bound, in nominal dollars, assumed for open-ended source
    /// brackets when computing overlap. Only used for allocation; labels
    /// are never affected.
    pub open_ended_ceiling: Decimal,
}

impl Default for RedistributionConfig {
    fn default() -> Self {
        Self {
            open_ended_ceiling: Decimal::from(DEFAULT_OPEN_ENDED_CEILING),
        }
    }
}

impl RedistributionConfig {
    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`RedistributeError::InvalidCeiling`] if the ceiling is not
    /// positive.
    pub fn validate(&self) -> Result<(), RedistributeError> {
        if self.open_ended_ceiling <= Decimal::ZERO {
            return Err(RedistributeError::InvalidCeiling(self.open_ended_ceiling));
        }
        Ok(())
    }
}

/// Where a source bracket's population sits once its bounds are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceExtent {
    Span(Span),
    Point(Decimal),
}

impl SourceExtent {
    fn scaled(
        self,
        factor: Decimal,
    ) -> Result<Self, RedistributeError> {
        let overflow = |amount| RedistributeError::Overflow {
            amount,
            multiplier: factor,
        };
        match self {
            Self::Span(span) => span
                .scaled(factor)
                .map(Self::Span)
                .ok_or_else(|| overflow(span.max)),
            Self::Point(value) => value
                .checked_mul(factor)
                .map(Self::Point)
                .ok_or_else(|| overflow(value)),
        }
    }
}

/// Redistributes source rows into a fixed set of target brackets.
#[derive(Debug, Clone)]
pub struct Redistributor<'a> {
    targets: &'a TargetBrackets,
    config: RedistributionConfig,
}

impl<'a> Redistributor<'a> {
    /// Creates a redistributor over `targets`.
    ///
    /// # Errors
    ///
    /// Returns [`RedistributeError::InvalidCeiling`] if the configuration is
    /// invalid.
    pub fn new(
        targets: &'a TargetBrackets,
        config: RedistributionConfig,
    ) -> Result<Self, RedistributeError> {
        config.validate()?;
        Ok(Self { targets, config })
    }

    pub fn targets(&self) -> &TargetBrackets {
        self.targets
    }

    pub fn config(&self) -> &RedistributionConfig {
        &self.config
    }

    /// Share of a source bracket assigned to each overlapping target.
    ///
    /// Targets with zero overlap are omitted; the returned fractions sum to
    /// one.
    pub fn allocations(
        &self,
        source: &BracketBounds,
        multiplier: Decimal,
    ) -> Result<Vec<(&'a Bracket, Decimal)>, RedistributeError> {
        if multiplier <= Decimal::ZERO {
            return Err(RedistributeError::InvalidMultiplier(multiplier));
        }

        let targets = self.targets;
        match self.extent(source).scaled(multiplier)? {
            SourceExtent::Span(span) => Ok(targets
                .iter()
                .filter_map(|target| {
                    let fraction = overlap_fraction(span, &target.bounds);
                    (fraction > Decimal::ZERO).then_some((target, fraction))
                })
                .collect()),
            SourceExtent::Point(value) => targets
                .find_containing(value)
                .map(|target| vec![(target, Decimal::ONE)])
                .ok_or(RedistributeError::Uncovered(value)),
        }
    }

    /// Redistributes one source row.
    ///
    /// # Errors
    ///
    /// Returns [`RedistributeError::Parse`] if the row's income range cannot
    /// be parsed, [`RedistributeError::InvalidMultiplier`] for a
    /// non-positive multiplier, and [`RedistributeError::Overflow`] when an
    /// inflated amount does not fit in a decimal.
    pub fn redistribute_row(
        &self,
        row: &StatsRow,
        multiplier: Decimal,
    ) -> Result<Vec<StatsRow>, RedistributeError> {
        let source = Bracket::parse(&row.income_range)?;
        let allocations = self.allocations(&source.bounds, multiplier)?;

        debug!(
            year = %row.year,
            bracket = %source,
            targets = allocations.len(),
            "redistributing row"
        );

        let totals = row.totals;
        let individuals = Decimal::from(totals.individuals);

        let inflate = |amount: Decimal, fraction: Decimal| {
            (amount * fraction)
                .checked_mul(multiplier)
                .ok_or(RedistributeError::Overflow { amount, multiplier })
        };

        allocations
            .into_iter()
            .map(|(target, fraction)| {
                let share = GroupAggregate {
                    individuals: round_count(individuals * fraction),
                    income: inflate(totals.income, fraction)?,
                    tax: inflate(totals.tax, fraction)?,
                };
                Ok(StatsRow::new(
                    row.year.clone(),
                    row.key.clone(),
                    target.label.clone(),
                    share,
                ))
            })
            .collect()
    }

    /// Redistributes a whole table and collapses the result.
    ///
    /// Every row's multiplier comes from `inflation`. The first failing row
    /// aborts the run; nothing is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RedistributeError::Row`] wrapping the cause and the 1-based
    /// row number.
    pub fn redistribute(
        &self,
        rows: &[StatsRow],
        inflation: &InflationTable,
    ) -> Result<Vec<StatsRow>, RedistributeError> {
        let mut emitted = Vec::with_capacity(rows.len() * 2);

        for (idx, row) in rows.iter().enumerate() {
            let attempt = inflation
                .multiplier(&row.year)
                .ok_or_else(|| RedistributeError::UnknownYear(row.year.clone()))
                .and_then(|multiplier| self.redistribute_row(row, multiplier));

            match attempt {
                Ok(shares) => emitted.extend(shares),
                Err(source) => {
                    return Err(RedistributeError::Row {
                        row: idx + 1,
                        source: Box::new(source),
                    });
                }
            }
        }

        let collapsed = collapse(emitted, self.targets);
        info!(
            source_rows = rows.len(),
            output_rows = collapsed.len(),
            "redistribution complete"
        );

        Ok(collapsed)
    }

    fn extent(
        &self,
        source: &BracketBounds,
    ) -> SourceExtent {
        let ceiling = self.config.open_ended_ceiling;
        match source.max {
            Some(max) => SourceExtent::Span(Span::new(source.min, max)),
            None if ceiling > source.min => SourceExtent::Span(Span::new(source.min, ceiling)),
            None => SourceExtent::Point(source.min),
        }
    }
}

/// Sums rows sharing (year, demographic key, income range) into one row.
///
/// Output is ordered by year, key, then the bracket's rank in `order`;
/// labels not in `order` sort after every known bracket.
pub fn collapse<I>(
    rows: I,
    order: &TargetBrackets,
) -> Vec<StatsRow>
where
    I: IntoIterator<Item = StatsRow>,
{
    let mut groups: BTreeMap<(IncomeYear, DemographicKey, usize, String), GroupAggregate> =
        BTreeMap::new();

    for row in rows {
        let rank = order.position(&row.income_range).unwrap_or(usize::MAX);
        *groups
            .entry((row.year, row.key, rank, row.income_range))
            .or_default() += row.totals;
    }

    groups
        .into_iter()
        .map(|((year, key, _, income_range), totals)| StatsRow {
            year,
            key,
            income_range,
            totals,
        })
        .collect()
}
