//! Income brackets and the label parser.
//!
//! ATO tables label income ranges in three shapes:
//!
//! | Shape                | Bounds              |
//! |----------------------|---------------------|
//! | `$6,000 or less`     | `[0, 6000]`         |
//! | `$20,001 to $30,000` | `[20001, 30000]`    |
//! | `$1,000,001 or more` | `[1000001, ∞)`      |
//!
//! The `$` sign and thousands separators are optional. Some exports prefix
//! labels with a sort key (`B00020001. $20,001 to $30,000`); the prefix is
//! stripped before parsing and is never part of a bracket's identity.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static SORT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]?\d+\.\s+").expect("sort prefix pattern is valid"));

static OR_LESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\$?\s*(\d[\d,]*)\s+or\s+less$").expect("'or less' pattern is valid")
});

static OR_MORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\$?\s*(\d[\d,]*)\s+or\s+more$").expect("'or more' pattern is valid")
});

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\$?\s*(\d[\d,]*)\s*to\s*\$?\s*(\d[\d,]*)$").expect("range pattern is valid")
});

/// Errors produced when a bracket label cannot be turned into bounds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BracketParseError {
    /// The label contains no digits at all.
    #[error("bracket label '{label}' contains no amount")]
    NoAmount { label: String },

    /// The label has amounts but is not `X or less`, `A to B` or `X or more`.
    #[error("bracket label '{label}' is not of the form 'X or less', 'A to B' or 'X or more'")]
    UnrecognisedShape { label: String },

    /// An amount is too large to represent.
    #[error("bracket label '{label}' has an amount out of range")]
    AmountOutOfRange { label: String },

    /// The parsed upper bound does not exceed the lower bound.
    #[error("bracket label '{label}' has upper bound {max} not above lower bound {min}")]
    InvalidBounds {
        label: String,
        min: Decimal,
        max: Decimal,
    },
}

/// Removes a leading sort key such as `B00010001. ` or `02. `.
pub fn strip_sort_prefix(label: &str) -> &str {
    let trimmed = label.trim();
    match SORT_PREFIX.find(trimmed) {
        Some(found) => &trimmed[found.end()..],
        None => trimmed,
    }
}

/// Numeric extent of a bracket in currency units.
///
/// `max` is `None` for an unbounded ("or more") bracket. A finite stand-in
/// for the missing bound is chosen by the caller that needs one, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BracketBounds {
    pub min: Decimal,
    pub max: Option<Decimal>,
}

impl BracketBounds {
    pub fn bounded(
        min: Decimal,
        max: Decimal,
    ) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn at_least(min: Decimal) -> Self {
        Self { min, max: None }
    }

    pub fn is_open_ended(&self) -> bool {
        self.max.is_none()
    }

    /// Half-open membership: `min <= value < max`.
    pub fn contains(
        &self,
        value: Decimal,
    ) -> bool {
        value >= self.min && self.max.is_none_or(|max| value < max)
    }
}

impl Ord for BracketBounds {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.min.cmp(&other.min).then_with(|| match (self.max, other.max) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    }
}

impl PartialOrd for BracketBounds {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A labelled income bracket.
///
/// Brackets order by their bounds, so a sorted list of brackets reads from
/// the lowest income range to the unbounded top range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bracket {
    pub label: String,
    pub bounds: BracketBounds,
}

impl Bracket {
    pub fn new(
        label: impl Into<String>,
        bounds: BracketBounds,
    ) -> Self {
        Self {
            label: label.into(),
            bounds,
        }
    }

    /// Parses a display label into a bracket.
    ///
    /// The returned label has any sort prefix removed.
    ///
    /// # Errors
    ///
    /// Returns [`BracketParseError`] naming the offending label when it has
    /// no amount, an unknown shape, or an empty range.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use taxstats_core::Bracket;
    ///
    /// let bracket = Bracket::parse("$20,001 to $30,000").unwrap();
    /// assert_eq!(bracket.bounds.min, dec!(20001));
    /// assert_eq!(bracket.bounds.max, Some(dec!(30000)));
    ///
    /// let top = Bracket::parse("$1,000,001 or more").unwrap();
    /// assert!(top.bounds.is_open_ended());
    /// ```
    pub fn parse(label: &str) -> Result<Self, BracketParseError> {
        let label = strip_sort_prefix(label);
        let bounds = parse_bounds(label)?;

        Ok(Self::new(label, bounds))
    }

    pub fn is_open_ended(&self) -> bool {
        self.bounds.is_open_ended()
    }
}

impl Ord for Bracket {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.bounds
            .cmp(&other.bounds)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for Bracket {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Bracket {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn parse_bounds(label: &str) -> Result<BracketBounds, BracketParseError> {
    if !label.chars().any(|c| c.is_ascii_digit()) {
        return Err(BracketParseError::NoAmount {
            label: label.to_string(),
        });
    }

    if let Some(caps) = OR_LESS.captures(label) {
        let max = parse_amount(label, &caps[1])?;
        return checked(label, Decimal::ZERO, max);
    }

    if let Some(caps) = OR_MORE.captures(label) {
        return Ok(BracketBounds::at_least(parse_amount(label, &caps[1])?));
    }

    if let Some(caps) = RANGE.captures(label) {
        let min = parse_amount(label, &caps[1])?;
        let max = parse_amount(label, &caps[2])?;
        return checked(label, min, max);
    }

    Err(BracketParseError::UnrecognisedShape {
        label: label.to_string(),
    })
}

fn checked(
    label: &str,
    min: Decimal,
    max: Decimal,
) -> Result<BracketBounds, BracketParseError> {
    if max <= min {
        return Err(BracketParseError::InvalidBounds {
            label: label.to_string(),
            min,
            max,
        });
    }
    Ok(BracketBounds::bounded(min, max))
}

// Captures are digits and commas only; the one failure left is overflow.
fn parse_amount(
    label: &str,
    digits: &str,
) -> Result<Decimal, BracketParseError> {
    digits
        .replace(',', "")
        .parse()
        .map_err(|_| BracketParseError::AmountOutOfRange {
            label: label.to_string(),
        })
}
