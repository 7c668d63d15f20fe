use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

const EN_DASH: char = '–';

/// An ATO financial year label such as `2010–11`.
///
/// Source files mix hyphens and en-dashes; both are stored as the en-dash
/// form so `2010-11` and `2010–11` name the same year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct IncomeYear(String);

impl IncomeYear {
    pub fn new(label: &str) -> Self {
        let normalized = label
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '—' | '‐' => EN_DASH,
                other => other,
            })
            .collect();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar year in which the financial year starts, if the label has one.
    pub fn start_year(&self) -> Option<i32> {
        let digits: String = self.0.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
}

impl Ord for IncomeYear {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.start_year()
            .cmp(&other.start_year())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for IncomeYear {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for IncomeYear {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncomeYear {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for IncomeYear {
    fn from(label: String) -> Self {
        Self::new(&label)
    }
}

impl From<IncomeYear> for String {
    fn from(year: IncomeYear) -> Self {
        year.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn hyphen_and_en_dash_are_the_same_year() {
        assert_eq!(IncomeYear::new("2010-11"), IncomeYear::new("2010–11"));
        assert_eq!(IncomeYear::new(" 2022-23 ").as_str(), "2022–23");
    }

    #[test]
    fn start_year_reads_leading_digits() {
        assert_eq!(IncomeYear::new("2016–17").start_year(), Some(2016));
        assert_eq!(IncomeYear::new("unknown").start_year(), None);
    }

    #[test]
    fn years_order_chronologically() {
        let mut years = vec![
            IncomeYear::new("2022–23"),
            IncomeYear::new("2010–11"),
            IncomeYear::new("2015-16"),
        ];
        years.sort();

        let labels: Vec<_> = years.iter().map(IncomeYear::as_str).collect();
        assert_eq!(labels, vec!["2010–11", "2015–16", "2022–23"]);
    }
}
