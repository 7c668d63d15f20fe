use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use taxstats_core::IncomeYear;
use taxstats_core::calculations::{IntegrityVerifier, Redistributor, bracket_distribution};
use taxstats_data::logging::init_logging;
use taxstats_data::{Settings, StatsLoader};
use tracing::info;

/// Normalize, inflation-adjust and verify ATO taxpayer statistics tables.
#[derive(Parser, Debug)]
#[command(name = "taxstats")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML settings file; built-in reference data is used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-bucket a raw ATO extract onto the target brackets
    Normalize {
        /// Raw ATO CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Normalized CSV file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Redistribute a normalized table into reference-year brackets
    Redistribute {
        /// Normalized CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Redistributed CSV file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check a redistributed table against its source
    Verify {
        /// Normalized CSV file the redistribution was made from
        #[arg(long)]
        original: PathBuf,

        /// Redistributed CSV file
        #[arg(long)]
        redistributed: PathBuf,

        /// Also print the per-bracket individual counts for this year
        #[arg(long)]
        year: Option<String>,
    },
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings: {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn normalize(
    settings: &Settings,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let targets = settings.target_brackets()?;
    let rows = StatsLoader::load_raw_file(input)
        .with_context(|| format!("Failed to parse CSV: {}", input.display()))?;
    info!(rows = rows.len(), input = %input.display(), "loaded raw table");

    let normalized = settings.normalizer().normalize(rows, &targets);

    StatsLoader::write_file(output, &normalized)
        .with_context(|| format!("Failed to write: {}", output.display()))?;
    info!(rows = normalized.len(), output = %output.display(), "wrote normalized table");
    Ok(())
}

fn redistribute(
    settings: &Settings,
    input: &Path,
    output: &Path,
) -> Result<()> {
    let targets = settings.target_brackets()?;
    let inflation = settings.inflation_table()?;
    let redistributor = Redistributor::new(&targets, settings.redistribution_config()?)?;

    let rows = StatsLoader::load_file(input)
        .with_context(|| format!("Failed to parse CSV: {}", input.display()))?;
    info!(rows = rows.len(), input = %input.display(), "loaded normalized table");

    let redistributed = redistributor
        .redistribute(&rows, &inflation)
        .with_context(|| format!("Failed to redistribute: {}", input.display()))?;

    StatsLoader::write_file(output, &redistributed)
        .with_context(|| format!("Failed to write: {}", output.display()))?;
    info!(
        rows = redistributed.len(),
        output = %output.display(),
        reference_year = %inflation.reference_year(),
        "wrote redistributed table"
    );
    Ok(())
}

fn verify(
    settings: &Settings,
    original: &Path,
    redistributed: &Path,
    year: Option<&str>,
) -> Result<bool> {
    let inflation = settings.inflation_table()?;
    let verifier = IntegrityVerifier::new(settings.tolerances()?);

    let before = StatsLoader::load_file(original)
        .with_context(|| format!("Failed to parse CSV: {}", original.display()))?;
    let after = StatsLoader::load_file(redistributed)
        .with_context(|| format!("Failed to parse CSV: {}", redistributed.display()))?;

    let report = verifier.verify(&before, &after, &inflation);

    for result in &report.years {
        let status = if result.passed() { "ok" } else { "FAILED" };
        let income = result
            .income
            .map(|c| format!("{:.4}%", c.relative_difference * Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| "n/a".to_string());
        let tax = result
            .tax
            .map(|t| format!("{:.2}%", t.relative_change() * Decimal::ONE_HUNDRED))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{}  {:<6}  individuals {:.4}%  income {}  tax change {}",
            result.year,
            status,
            result.individuals.relative_difference * Decimal::ONE_HUNDRED,
            income,
            tax,
        );
    }
    for violation in report.violations() {
        println!("violation: {violation}");
    }

    if let Some(year) = year {
        let targets = settings.target_brackets()?;
        let year = IncomeYear::new(year);
        println!();
        println!("{year}: individuals by bracket");
        for shift in bracket_distribution(&before, &after, &year, &targets) {
            println!(
                "  {:<24} {:>12} {:>12} {:>+12}",
                shift.income_range,
                shift.original,
                shift.redistributed,
                shift.change()
            );
        }
    }

    Ok(report.is_valid())
}

fn run(args: Args) -> Result<ExitCode> {
    let settings = load_settings(args.config.as_deref())?;

    match args.command {
        Command::Normalize { input, output } => normalize(&settings, &input, &output)?,
        Command::Redistribute { input, output } => redistribute(&settings, &input, &output)?,
        Command::Verify {
            original,
            redistributed,
            year,
        } => {
            if !verify(&settings, &original, &redistributed, year.as_deref())? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref(), args.log_file.as_deref())?;

    run(args)
}
