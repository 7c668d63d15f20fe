//! File-facing side of taxstats: CSV tables, TOML settings and logging.

pub mod loader;
pub mod logging;
pub mod settings;

pub use loader::{RawStatsRecord, StatsLoadError, StatsLoader, StatsRecord};
pub use settings::{Settings, SettingsError};
