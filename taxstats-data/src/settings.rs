//! TOML run settings.
//!
//! Every section is optional; anything left out falls back to the built-in
//! 2010–11 to 2022–23 reference data.
//!
//! ```toml
//! reference_year = "2022–23"
//! open_ended_ceiling = 2000000
//!
//! [inflation]
//! "2021–22" = 1.07
//! "2022–23" = 1.00
//!
//! [targets]
//! labels = ["$50,000 or less", "$50,001 to $100,000", "$100,001 or more"]
//!
//! [tolerances]
//! individuals = 0.001
//! income = 0.0001
//!
//! [normalization]
//! "$250,001 or more" = "$250,001 to $500,000"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use taxstats_core::calculations::{
    BracketNormalizer, RedistributeError, RedistributionConfig, Tolerances,
};
use taxstats_core::{BracketSetError, IncomeYear, InflationError, InflationTable, TargetBrackets};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid inflation table: {0}")]
    Inflation(#[from] InflationError),

    #[error("invalid target brackets: {0}")]
    Targets(#[from] BracketSetError),

    #[error("invalid redistribution settings: {0}")]
    Redistribution(#[from] RedistributeError),

    #[error("tolerance for {metric} must be positive, got {value}")]
    InvalidTolerance { metric: &'static str, value: Decimal },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSettings {
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceSettings {
    pub individuals: Option<Decimal>,
    pub income: Option<Decimal>,
}

/// Settings as written in the file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub reference_year: Option<String>,
    pub open_ended_ceiling: Option<Decimal>,
    pub inflation: BTreeMap<String, Decimal>,
    pub targets: TargetSettings,
    pub tolerances: ToleranceSettings,
    pub normalization: BTreeMap<String, String>,
}

impl Settings {
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// The configured inflation table.
    ///
    /// Without an `[inflation]` section the built-in multipliers are used,
    /// re-validated against `reference_year` if one is given.
    pub fn inflation_table(&self) -> Result<InflationTable, SettingsError> {
        let builtin = InflationTable::reference();
        let reference_year = self
            .reference_year
            .as_deref()
            .map(IncomeYear::new)
            .unwrap_or_else(|| builtin.reference_year().clone());

        if self.inflation.is_empty() {
            if &reference_year == builtin.reference_year() {
                return Ok(builtin);
            }
            let factors = builtin
                .years()
                .filter_map(|year| builtin.multiplier(year).map(|m| (year.clone(), m)))
                .collect();
            return Ok(InflationTable::new(reference_year, factors)?);
        }

        let factors = self
            .inflation
            .iter()
            .map(|(year, multiplier)| (IncomeYear::new(year), *multiplier))
            .collect();
        Ok(InflationTable::new(reference_year, factors)?)
    }

    pub fn target_brackets(&self) -> Result<TargetBrackets, SettingsError> {
        match &self.targets.labels {
            Some(labels) => Ok(TargetBrackets::from_labels(labels)?),
            None => Ok(TargetBrackets::reference()),
        }
    }

    pub fn redistribution_config(&self) -> Result<RedistributionConfig, SettingsError> {
        let mut config = RedistributionConfig::default();
        if let Some(ceiling) = self.open_ended_ceiling {
            config.open_ended_ceiling = ceiling;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn tolerances(&self) -> Result<Tolerances, SettingsError> {
        let defaults = Tolerances::default();
        let tolerances = Tolerances {
            individuals: self.tolerances.individuals.unwrap_or(defaults.individuals),
            income: self.tolerances.income.unwrap_or(defaults.income),
        };

        for (metric, value) in [
            ("individuals", tolerances.individuals),
            ("income", tolerances.income),
        ] {
            if value <= Decimal::ZERO {
                return Err(SettingsError::InvalidTolerance { metric, value });
            }
        }
        Ok(tolerances)
    }

    /// The built-in mapping with the `[normalization]` entries applied on top.
    pub fn normalizer(&self) -> BracketNormalizer {
        BracketNormalizer::reference().with_overrides(
            self.normalization
                .iter()
                .map(|(raw, target)| (raw.clone(), target.clone())),
        )
    }
}
