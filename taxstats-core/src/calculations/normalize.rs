//! Re-bucketing of raw ATO income ranges onto the target bracket set.
//!
//! The ATO changed its published income ranges several times between
//! 2010–11 and 2022–23 (for example `$10,001 to $18,200` and
//! `$37,001 to $41,000` only exist in some years). Before years can be
//! compared every raw range is relabelled with the target bracket it is
//! filed under, and rows that now share a label are summed.
//!
//! Unlike [`Redistributor`](crate::calculations::Redistributor) this is a
//! plain relabelling: a raw range moves as a whole, without any
//! proportional split.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::calculations::redistribute::collapse;
use crate::models::{StatsRow, TargetBrackets, strip_sort_prefix};

/// Raw label → reference label, for ranges that are not themselves
/// reference brackets.
const REFERENCE_MAPPING: [(&str, &str); 31] = [
    ("$10,001 to $15,000", "$10,001 to $20,000"),
    ("$15,001 to $20,000", "$10,001 to $20,000"),
    ("$10,001 to $18,200", "$10,001 to $20,000"),
    ("$18,201 to $25,000", "$20,001 to $30,000"),
    ("$20,001 to $25,000", "$20,001 to $30,000"),
    ("$25,001 to $30,000", "$20,001 to $30,000"),
    ("$30,001 to $37,000", "$30,001 to $40,000"),
    ("$37,001 to $40,000", "$30,001 to $40,000"),
    ("$37,001 to $41,000", "$40,001 to $50,000"),
    ("$40,001 to $45,000", "$40,001 to $50,000"),
    ("$41,001 to $45,000", "$40,001 to $50,000"),
    ("$45,001 to $50,000", "$40,001 to $50,000"),
    ("$45,001 to $48,000", "$40,001 to $50,000"),
    ("$48,001 to $50,000", "$40,001 to $50,000"),
    ("$50,001 to $55,000", "$50,001 to $60,000"),
    ("$55,001 to $60,000", "$50,001 to $60,000"),
    ("$60,001 to $70,000", "$60,001 to $80,000"),
    ("$60,001 to $66,667", "$60,001 to $80,000"),
    ("$66,668 to $70,000", "$60,001 to $80,000"),
    ("$70,001 to $80,000", "$60,001 to $80,000"),
    ("$80,001 to $90,000", "$80,001 to $100,000"),
    ("$80,001 to $87,000", "$80,001 to $100,000"),
    ("$87,001 to $90,000", "$80,001 to $100,000"),
    ("$90,001 to $100,000", "$80,001 to $100,000"),
    ("$100,001 to $120,000", "$100,001 to $150,000"),
    ("$120,001 to $125,333", "$100,001 to $150,000"),
    ("$125,334 to $150,000", "$100,001 to $150,000"),
    ("$150,001 to $180,000", "$150,001 to $200,000"),
    ("$180,001 to $200,000", "$150,001 to $200,000"),
    ("$180,001 to $250,000", "$200,001 to $250,000"),
    // Only published for under-18s; filed with the first high bracket.
    ("$250,001 or more", "$250,001 to $500,000"),
];

/// Placeholder used by summary rows in every categorical column.
const ALL_RANGES: &str = "all ranges";

/// Whether `row` is a pre-aggregated summary row (`All` sex or taxable
/// status, or `all ranges` age or income range).
pub fn is_aggregate_row(row: &StatsRow) -> bool {
    row.key.sex.eq_ignore_ascii_case("all")
        || row.key.taxable_status.eq_ignore_ascii_case("all")
        || row.key.age_range.eq_ignore_ascii_case(ALL_RANGES)
        || strip_sort_prefix(&row.income_range).eq_ignore_ascii_case(ALL_RANGES)
}

/// Relabels raw income ranges with target bracket labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketNormalizer {
    mapping: HashMap<String, String>,
}

impl BracketNormalizer {
    pub fn new(mapping: HashMap<String, String>) -> Self {
        Self { mapping }
    }

    /// The mapping used for the published 2010–11 to 2022–23 tables.
    pub fn reference() -> Self {
        Self::new(
            REFERENCE_MAPPING
                .iter()
                .map(|(raw, target)| (raw.to_string(), target.to_string()))
                .collect(),
        )
    }

    /// Adds or replaces entries, keeping the rest of the mapping.
    pub fn with_overrides<I>(
        mut self,
        overrides: I,
    ) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.mapping.extend(overrides);
        self
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Target label for a raw label, or `None` if the label is neither a
    /// target bracket nor mapped.
    pub fn normalize_label<'a>(
        &'a self,
        raw: &'a str,
        targets: &'a TargetBrackets,
    ) -> Option<&'a str> {
        let label = strip_sort_prefix(raw);
        if let Some(bracket) = targets.get(label) {
            return Some(bracket.label.as_str());
        }
        self.mapping.get(label).map(String::as_str)
    }

    /// Drops summary rows, relabels every remaining row and collapses
    /// rows that end up in the same cell.
    ///
    /// Labels with no mapping are kept as they are and logged, so that the
    /// redistributor can still parse them and nothing is lost.
    pub fn normalize<I>(
        &self,
        rows: I,
        targets: &TargetBrackets,
    ) -> Vec<StatsRow>
    where
        I: IntoIterator<Item = StatsRow>,
    {
        let mut dropped = 0usize;
        let relabelled: Vec<StatsRow> = rows
            .into_iter()
            .filter(|row| {
                let aggregate = is_aggregate_row(row);
                if aggregate {
                    dropped += 1;
                }
                !aggregate
            })
            .map(|mut row| {
                row.income_range = match self.normalize_label(&row.income_range, targets) {
                    Some(label) => label.to_string(),
                    None => {
                        warn!(label = %row.income_range, "no normalized bracket for income range, keeping it");
                        strip_sort_prefix(&row.income_range).to_string()
                    }
                };
                row
            })
            .collect();

        debug!(
            kept = relabelled.len(),
            dropped_aggregates = dropped,
            "normalized income ranges"
        );

        collapse(relabelled, targets)
    }
}

impl Default for BracketNormalizer {
    fn default() -> Self {
        Self::reference()
    }
}
