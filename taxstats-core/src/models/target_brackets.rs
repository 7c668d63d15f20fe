use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Bracket, BracketBounds, BracketParseError};

/// Errors raised when a bracket list is not a valid partition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BracketSetError {
    #[error("target bracket set is empty")]
    Empty,

    #[error("first target bracket '{label}' starts at {min}, not 0")]
    DoesNotStartAtZero { label: String, min: Decimal },

    #[error("target bracket '{label}' is unbounded but is not the last bracket")]
    UnboundedBeforeEnd { label: String },

    #[error("last target bracket '{label}' must be unbounded")]
    BoundedTop { label: String },

    #[error("target brackets '{previous}' and '{next}' are not contiguous ({end} vs {start})")]
    NotContiguous {
        previous: String,
        next: String,
        end: Decimal,
        start: Decimal,
    },

    #[error("duplicate target bracket label '{0}'")]
    DuplicateLabel(String),

    #[error(transparent)]
    Parse(#[from] BracketParseError),
}

/// An ordered, gap-free partition of `[0, ∞)` into labelled brackets.
///
/// Every target bracket is half-open, `[min, max)`, and each bracket starts
/// exactly where the previous one ends, so every amount falls into exactly
/// one bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBrackets {
    brackets: Vec<Bracket>,
}

/// The modern bracket set shared by every year, as (label, min, max).
const REFERENCE_BRACKETS: [(&str, i64, Option<i64>); 15] = [
    ("$6,000 or less", 0, Some(6_000)),
    ("$6,001 to $10,000", 6_000, Some(10_000)),
    ("$10,001 to $20,000", 10_000, Some(20_000)),
    ("$20,001 to $30,000", 20_000, Some(30_000)),
    ("$30,001 to $40,000", 30_000, Some(40_000)),
    ("$40,001 to $50,000", 40_000, Some(50_000)),
    ("$50,001 to $60,000", 50_000, Some(60_000)),
    ("$60,001 to $80,000", 60_000, Some(80_000)),
    ("$80,001 to $100,000", 80_000, Some(100_000)),
    ("$100,001 to $150,000", 100_000, Some(150_000)),
    ("$150,001 to $200,000", 150_000, Some(200_000)),
    ("$200,001 to $250,000", 200_000, Some(250_000)),
    ("$250,001 to $500,000", 250_000, Some(500_000)),
    ("$500,001 to $1,000,000", 500_000, Some(1_000_000)),
    ("$1,000,001 or more", 1_000_000, None),
];

impl TargetBrackets {
    /// Validates and wraps an explicit list of brackets.
    ///
    /// # Errors
    ///
    /// Returns [`BracketSetError`] if the list is empty, does not start at
    /// zero, has a gap or overlap, repeats a label, or does not end with a
    /// single unbounded bracket.
    pub fn new(brackets: Vec<Bracket>) -> Result<Self, BracketSetError> {
        let (first, last) = match (brackets.first(), brackets.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(BracketSetError::Empty),
        };

        if first.bounds.min != Decimal::ZERO {
            return Err(BracketSetError::DoesNotStartAtZero {
                label: first.label.clone(),
                min: first.bounds.min,
            });
        }

        if !last.is_open_ended() {
            return Err(BracketSetError::BoundedTop {
                label: last.label.clone(),
            });
        }

        for pair in brackets.windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            let Some(end) = previous.bounds.max else {
                return Err(BracketSetError::UnboundedBeforeEnd {
                    label: previous.label.clone(),
                });
            };
            if next.bounds.min != end {
                return Err(BracketSetError::NotContiguous {
                    previous: previous.label.clone(),
                    next: next.label.clone(),
                    end,
                    start: next.bounds.min,
                });
            }
        }

        for (i, bracket) in brackets.iter().enumerate() {
            if brackets[..i].iter().any(|b| b.label == bracket.label) {
                return Err(BracketSetError::DuplicateLabel(bracket.label.clone()));
            }
        }

        Ok(Self { brackets })
    }

    /// Builds a partition from display labels in ascending order.
    ///
    /// Labels describe whole-dollar ranges (`$6,001 to $10,000` follows
    /// `$6,000 or less`), so a lower bound one above the previous upper bound
    /// is moved down onto it to close the one-dollar gap.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, BracketSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut brackets: Vec<Bracket> = Vec::new();

        for label in labels {
            let mut bracket = Bracket::parse(label.as_ref())?;
            if let Some(end) = brackets.last().and_then(|b| b.bounds.max) {
                if bracket.bounds.min == end + Decimal::ONE {
                    bracket.bounds.min = end;
                }
            }
            brackets.push(bracket);
        }

        Self::new(brackets)
    }

    /// The fifteen modern brackets from `$6,000 or less` to
    /// `$1,000,001 or more`.
    pub fn reference() -> Self {
        let brackets = REFERENCE_BRACKETS
            .iter()
            .map(|(label, min, max)| {
                let bounds = BracketBounds {
                    min: Decimal::from(*min),
                    max: max.map(Decimal::from),
                };
                Bracket::new(*label, bounds)
            })
            .collect();

        Self { brackets }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bracket> {
        self.brackets.iter()
    }

    pub fn len(&self) -> usize {
        self.brackets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brackets.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.brackets.iter().map(|b| b.label.as_str())
    }

    /// Index of the bracket with `label`, which is also its sort rank.
    pub fn position(
        &self,
        label: &str,
    ) -> Option<usize> {
        self.brackets.iter().position(|b| b.label == label)
    }

    pub fn get(
        &self,
        label: &str,
    ) -> Option<&Bracket> {
        self.brackets.iter().find(|b| b.label == label)
    }

    /// The bracket containing `value`. Always `Some` for non-negative values.
    pub fn find_containing(
        &self,
        value: Decimal,
    ) -> Option<&Bracket> {
        self.brackets.iter().find(|b| b.bounds.contains(value))
    }
}

impl Default for TargetBrackets {
    fn default() -> Self {
        Self::reference()
    }
}

impl<'a> IntoIterator for &'a TargetBrackets {
    type Item = &'a Bracket;
    type IntoIter = std::slice::Iter<'a, Bracket>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
