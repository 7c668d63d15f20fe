//! CSV reading and writing of taxpayer statistics tables.
//!
//! ## Normalized format
//!
//! Read by [`StatsLoader::parse`] and written by [`StatsLoader::write`].
//! Headers are matched by name and surrounding whitespace is trimmed.
//!
//! | Column                | Type    | Notes                                   |
//! |-----------------------|---------|-----------------------------------------|
//! | `income_year`         | string  | e.g. `2015–16`                          |
//! | `sex`                 | string  |                                         |
//! | `taxable_status`      | string  |                                         |
//! | `age_range`           | string  | sort prefixes are dropped               |
//! | `income_range`        | string  | a bracket label, e.g. `$6,000 or less`  |
//! | `individuals_count`   | integer | `1234.0` is accepted, `1234.5` is not   |
//! | `total_income_amount` | decimal |                                         |
//! | `net_tax_amount`      | decimal |                                         |
//!
//! ## Raw ATO format
//!
//! Read by [`StatsLoader::parse_raw`]. Same columns, except the bracket is
//! in `taxable_income_range`. Any other column is ignored. Rows without an
//! individuals count are skipped, and empty amounts read as zero.
//!
//! ```csv
//! income_year,sex,taxable_status,age_range,taxable_income_range,individuals_count,total_income_amount,net_tax_amount
//! 2015–16,Male,Taxable,00. 18 - 24,"B00030001. $30,001 to $37,000",1200,40000000,3500000
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use taxstats_core::calculations::common::round_half_up;
use taxstats_core::{DemographicKey, GroupAggregate, IncomeYear, StatsRow};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when reading or writing statistics tables.
#[derive(Debug, Error)]
pub enum StatsLoadError {
    /// The CSV was structurally invalid or a field could not be
    /// deserialised (missing column, bad number, fractional count).
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StatsLoadError {
    fn io(
        path: &Path,
        source: std::io::Error,
    ) -> Self {
        StatsLoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One row of the normalized table, mirroring the CSV layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub income_year: String,
    pub sex: String,
    pub taxable_status: String,
    pub age_range: String,
    pub income_range: String,
    #[serde(deserialize_with = "deserialize_count")]
    pub individuals_count: u64,
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_income_amount: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub net_tax_amount: Decimal,
}

impl From<StatsRecord> for StatsRow {
    fn from(record: StatsRecord) -> Self {
        StatsRow::new(
            IncomeYear::new(&record.income_year),
            DemographicKey::new(&record.sex, &record.taxable_status, &record.age_range),
            record.income_range.trim(),
            GroupAggregate::new(
                record.individuals_count,
                record.total_income_amount,
                record.net_tax_amount,
            ),
        )
    }
}

impl From<&StatsRow> for StatsRecord {
    /// Amounts are rounded half-up to cents.
    fn from(row: &StatsRow) -> Self {
        Self {
            income_year: row.year.to_string(),
            sex: row.key.sex.clone(),
            taxable_status: row.key.taxable_status.clone(),
            age_range: row.key.age_range.clone(),
            income_range: row.income_range.clone(),
            individuals_count: row.totals.individuals,
            total_income_amount: round_half_up(row.totals.income),
            net_tax_amount: round_half_up(row.totals.tax),
        }
    }
}

/// One row of a raw ATO extract.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawStatsRecord {
    pub income_year: String,
    pub sex: String,
    pub taxable_status: String,
    pub age_range: String,
    pub taxable_income_range: String,
    #[serde(deserialize_with = "deserialize_optional_count")]
    pub individuals_count: Option<u64>,
    #[serde(deserialize_with = "deserialize_amount")]
    pub total_income_amount: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub net_tax_amount: Decimal,
}

impl RawStatsRecord {
    /// The row, or `None` when the extract has no count for it.
    pub fn into_row(self) -> Option<StatsRow> {
        let individuals = self.individuals_count?;
        Some(StatsRow::new(
            IncomeYear::new(&self.income_year),
            DemographicKey::new(&self.sex, &self.taxable_status, &self.age_range),
            self.taxable_income_range.trim(),
            GroupAggregate::new(individuals, self.total_income_amount, self.net_tax_amount),
        ))
    }
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    let cleaned = value.trim().replace(',', "");
    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| format!("invalid number '{value}'"))
}

fn parse_count(value: &str) -> Result<u64, String> {
    let count = parse_decimal(value)?;
    if count.is_sign_negative() || !count.fract().is_zero() {
        return Err(format!("invalid individuals count '{value}'"));
    }
    count
        .to_u64()
        .ok_or_else(|| format!("invalid individuals count '{value}'"))
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_count(&s).map_err(serde::de::Error::custom)
}

fn deserialize_optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_count(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(Decimal::ZERO),
        Some(s) => parse_decimal(&s).map_err(serde::de::Error::custom),
        None => Ok(Decimal::ZERO),
    }
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input)
}

/// Reads and writes statistics tables.
pub struct StatsLoader;

impl StatsLoader {
    /// Parse a normalized table. Rows are returned in file order.
    pub fn parse<R: Read>(input: R) -> Result<Vec<StatsRow>, StatsLoadError> {
        let rows = reader(input)
            .deserialize::<StatsRecord>()
            .map(|result| Ok(StatsRow::from(result?)))
            .collect::<Result<Vec<_>, StatsLoadError>>()?;

        debug!(rows = rows.len(), "parsed normalized table");
        Ok(rows)
    }

    /// Parse a raw ATO extract, skipping rows without a count.
    pub fn parse_raw<R: Read>(input: R) -> Result<Vec<StatsRow>, StatsLoadError> {
        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for (idx, result) in reader(input).deserialize::<RawStatsRecord>().enumerate() {
            let record = result?;
            let row_number = idx + 1;
            match record.into_row() {
                Some(row) => rows.push(row),
                None => {
                    warn!(row = row_number, "no individuals count, skipping row");
                    skipped += 1;
                }
            }
        }

        debug!(rows = rows.len(), skipped, "parsed raw table");
        Ok(rows)
    }

    /// Write a normalized table, amounts rounded to cents.
    pub fn write<W: Write>(
        output: W,
        rows: &[StatsRow],
    ) -> Result<(), StatsLoadError> {
        let mut writer = csv::Writer::from_writer(output);
        for row in rows {
            writer.serialize(StatsRecord::from(row))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn load_file(path: &Path) -> Result<Vec<StatsRow>, StatsLoadError> {
        let file = File::open(path).map_err(|e| StatsLoadError::io(path, e))?;
        Self::parse(file)
    }

    pub fn load_raw_file(path: &Path) -> Result<Vec<StatsRow>, StatsLoadError> {
        let file = File::open(path).map_err(|e| StatsLoadError::io(path, e))?;
        Self::parse_raw(file)
    }

    pub fn write_file(
        path: &Path,
        rows: &[StatsRow],
    ) -> Result<(), StatsLoadError> {
        let file = File::create(path).map_err(|e| StatsLoadError::io(path, e))?;
        Self::write(file, rows)
    }
}
