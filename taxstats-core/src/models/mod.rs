mod bracket;
mod demographic;
mod income_year;
mod inflation;
mod stats_row;
mod target_brackets;

pub use bracket::{Bracket, BracketBounds, BracketParseError, strip_sort_prefix};
pub use demographic::DemographicKey;
pub use income_year::IncomeYear;
pub use inflation::{InflationError, InflationTable};
pub use stats_row::{GroupAggregate, StatsRow};
pub use target_brackets::{BracketSetError, TargetBrackets};
