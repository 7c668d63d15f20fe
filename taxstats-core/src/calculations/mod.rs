//! Bracket calculations over taxpayer statistics tables.
//!
//! This module provides the pure transforms applied to the tables: bracket
//! normalization, inflation-adjusted redistribution through interval
//! overlap, and the integrity checks run afterwards.

pub mod common;
pub mod normalize;
pub mod overlap;
pub mod redistribute;
pub mod verify;

pub use normalize::{BracketNormalizer, is_aggregate_row};
pub use overlap::{Span, overlap_fraction};
pub use redistribute::{
    DEFAULT_OPEN_ENDED_CEILING, RedistributeError, RedistributionConfig, Redistributor, collapse,
};
pub use verify::{
    BracketShift, IntegrityMetric, IntegrityVerifier, IntegrityViolation, MetricCheck, TaxChange,
    Tolerances, VerificationReport, YearVerification, bracket_distribution,
};
