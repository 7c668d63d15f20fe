//! End-to-end runs over the sample ATO extract in `test-data/`.

use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use taxstats_core::calculations::{
    BracketShift, IntegrityVerifier, RedistributionConfig, Redistributor, bracket_distribution,
};
use taxstats_core::{
    DemographicKey, GroupAggregate, IncomeYear, InflationTable, StatsRow, TargetBrackets,
};
use taxstats_data::{Settings, StatsLoader};

const ATO_SAMPLE: &str = include_str!("../test-data/ato_sample.csv");
const SETTINGS: &str = include_str!("../test-data/taxstats.toml");

fn test_data(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test-data").join(name)
}

/// A scratch directory unique to one test.
fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("taxstats-{}-{test}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create scratch dir");
    dir
}

fn normalized_sample() -> Vec<StatsRow> {
    let rows = StatsLoader::parse_raw(ATO_SAMPLE.as_bytes()).expect("Failed to parse sample");
    Settings::default()
        .normalizer()
        .normalize(rows, &TargetBrackets::reference())
}

fn total_individuals(
    rows: &[StatsRow],
    year: &str,
) -> u64 {
    let year = IncomeYear::new(year);
    rows.iter()
        .filter(|r| r.year == year)
        .map(|r| r.totals.individuals)
        .sum()
}

#[test]
fn test_parse_raw_sample_skips_rows_without_count() {
    let rows = StatsLoader::parse_raw(ATO_SAMPLE.as_bytes()).expect("Failed to parse sample");

    assert_eq!(rows.len(), 8);
}

#[test]
fn test_normalize_sample() {
    let normalized = normalized_sample();

    assert_eq!(
        normalized,
        vec![
            StatsRow::new(
                IncomeYear::new("2015–16"),
                DemographicKey::new("Female", "Non Taxable", "25 - 29"),
                "$6,000 or less",
                GroupAggregate::new(50, dec!(150000), Decimal::ZERO),
            ),
            StatsRow::new(
                IncomeYear::new("2015–16"),
                DemographicKey::new("Male", "Taxable", "25 - 29"),
                "$30,001 to $40,000",
                GroupAggregate::new(400, dec!(14050000), dec!(1320000)),
            ),
            StatsRow::new(
                IncomeYear::new("2015–16"),
                DemographicKey::new("Male", "Taxable", "25 - 29"),
                "$1,000,001 or more",
                GroupAggregate::new(2, dec!(5000000), dec!(2200000)),
            ),
            StatsRow::new(
                IncomeYear::new("2022–23"),
                DemographicKey::new("Female", "Taxable", "40 - 44"),
                "$40,001 to $50,000",
                GroupAggregate::new(60, dec!(2840000), dec!(390000)),
            ),
        ]
    );
}

#[test]
fn test_redistribute_sample_passes_verification() {
    let targets = TargetBrackets::reference();
    let inflation = InflationTable::reference();
    let normalized = normalized_sample();
    let redistributor = Redistributor::new(&targets, RedistributionConfig::default())
        .expect("Failed to build redistributor");

    let redistributed = redistributor
        .redistribute(&normalized, &inflation)
        .expect("Failed to redistribute");
    let report = IntegrityVerifier::default().verify(&normalized, &redistributed, &inflation);

    assert!(report.is_valid(), "violations: {:?}", report.violations());
    assert_eq!(total_individuals(&redistributed, "2015–16"), 452);
    assert_eq!(total_individuals(&redistributed, "2022–23"), 60);
    assert!(
        redistributed
            .iter()
            .all(|row| targets.get(&row.income_range).is_some())
    );
}

#[test]
fn test_bracket_distribution_after_redistribution() {
    let targets = TargetBrackets::reference();
    let inflation = InflationTable::reference();
    let normalized = normalized_sample();
    let redistributed = Redistributor::new(&targets, RedistributionConfig::default())
        .expect("Failed to build redistributor")
        .redistribute(&normalized, &inflation)
        .expect("Failed to redistribute");

    let shifts = bracket_distribution(
        &normalized,
        &redistributed,
        &IncomeYear::new("2015–16"),
        &targets,
    );

    let shift = |label: &str, original: u64, redistributed: u64| BracketShift {
        income_range: label.to_string(),
        original,
        redistributed,
    };
    assert_eq!(
        shifts,
        vec![
            shift("$6,000 or less", 50, 41),
            shift("$6,001 to $10,000", 0, 9),
            shift("$30,001 to $40,000", 400, 122),
            shift("$40,001 to $50,000", 0, 278),
            shift("$1,000,001 or more", 2, 2),
        ]
    );
}

#[test]
fn test_written_tables_still_verify() {
    let dir = scratch_dir("written");
    let normalized_path = dir.join("normalized.csv");
    let redistributed_path = dir.join("redistributed.csv");
    let targets = TargetBrackets::reference();
    let inflation = InflationTable::reference();

    StatsLoader::write_file(&normalized_path, &normalized_sample()).expect("Failed to write");
    let normalized = StatsLoader::load_file(&normalized_path).expect("Failed to read back");
    let redistributed = Redistributor::new(&targets, RedistributionConfig::default())
        .expect("Failed to build redistributor")
        .redistribute(&normalized, &inflation)
        .expect("Failed to redistribute");
    StatsLoader::write_file(&redistributed_path, &redistributed).expect("Failed to write");
    let reloaded = StatsLoader::load_file(&redistributed_path).expect("Failed to read back");

    let report = IntegrityVerifier::default().verify(&normalized, &reloaded, &inflation);

    assert_eq!(reloaded.len(), redistributed.len());
    assert!(report.is_valid(), "violations: {:?}", report.violations());
}

#[test]
fn test_settings_file_drives_the_run() {
    let settings = Settings::load(&test_data("taxstats.toml")).expect("Failed to load settings");
    assert_eq!(settings, Settings::from_toml_str(SETTINGS).expect("parse"));

    let targets = settings.target_brackets().expect("targets");
    let inflation = settings.inflation_table().expect("inflation");
    let config = settings.redistribution_config().expect("config");
    let normalized = normalized_sample();

    let redistributed = Redistributor::new(&targets, config.clone())
        .expect("Failed to build redistributor")
        .redistribute(&normalized, &inflation)
        .expect("Failed to redistribute");
    let report = IntegrityVerifier::new(settings.tolerances().expect("tolerances")).verify(
        &normalized,
        &redistributed,
        &inflation,
    );

    assert_eq!(inflation.len(), 2);
    assert_eq!(config.open_ended_ceiling, dec!(3000000));
    assert!(report.is_valid(), "violations: {:?}", report.violations());
}

#[test]
fn test_verify_reports_uninflated_table() {
    let normalized = normalized_sample();
    let inflation = InflationTable::reference();

    // Comparing a table with itself leaves 2015–16 income short by 1.21x.
    let report = IntegrityVerifier::default().verify(&normalized, &normalized, &inflation);

    assert!(!report.is_valid());
    let violations = report.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].year(), &IncomeYear::new("2015–16"));
}

#[test]
fn test_cli_pipeline() {
    let dir = scratch_dir("cli");
    let normalized = dir.join("normalized.csv");
    let redistributed = dir.join("redistributed.csv");
    let taxstats = |args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_taxstats"))
            .args(args)
            .arg("--log-level")
            .arg("warn")
            .status()
            .expect("Failed to run taxstats")
    };
    let path = |p: &Path| p.to_str().expect("utf-8 path").to_string();

    let raw = path(&test_data("ato_sample.csv"));
    assert!(taxstats(&["normalize", "--input", &raw, "--output", &path(&normalized)]).success());
    assert!(
        taxstats(&[
            "redistribute",
            "--input",
            &path(&normalized),
            "--output",
            &path(&redistributed),
        ])
        .success()
    );
    assert!(
        taxstats(&[
            "verify",
            "--original",
            &path(&normalized),
            "--redistributed",
            &path(&redistributed),
            "--year",
            "2015-16",
        ])
        .success()
    );
    assert!(
        !taxstats(&[
            "verify",
            "--original",
            &path(&normalized),
            "--redistributed",
            &path(&normalized),
        ])
        .success()
    );
}
