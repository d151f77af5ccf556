use crate::assemble::dates::DateResolution;
use anyhow::Result;
use chrono::NaiveDate;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};

/// Pipeline configuration. Defaults work with no config file present so the
/// library never touches the filesystem on its own; the binary merges an
/// optional TOML file and `SOLARFLEET__`-prefixed environment variables on
/// top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub dates: DateWindowConfig,
    pub performance: PerformanceConfig,
    pub synthetic: SyntheticConfig,
}

/// Hard bounds for intraday date selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateWindowConfig {
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
    pub default_date: NaiveDate,
    /// Forces one resolution order for every site schema; each schema keeps
    /// its historical order when unset.
    pub resolution_override: Option<DateResolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Reference capacity for the intraday performance-ratio derivation.
    /// Historically a fixed constant shared by every site; see DESIGN.md.
    pub pr_reference_capacity_kw: f64,
}

/// Knobs for the synthetic site generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// The "today" that synthetic history counts back from. Fixed, not
    /// wall-clock: identical inputs must produce identical sites.
    pub anchor_date: NaiveDate,
    pub history_days: u32,
    pub forecast_days: u32,
    /// UTC offset applied to generated timestamps.
    pub utc_offset_hours: i32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dates: DateWindowConfig {
                min_date: NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                max_date: NaiveDate::from_ymd_opt(2025, 12, 5).unwrap(),
                default_date: NaiveDate::from_ymd_opt(2025, 11, 25).unwrap(),
                resolution_override: None,
            },
            performance: PerformanceConfig {
                pr_reference_capacity_kw: 1200.0,
            },
            synthetic: SyntheticConfig {
                anchor_date: NaiveDate::from_ymd_opt(2024, 9, 18).unwrap(),
                history_days: 14,
                forecast_days: 3,
                utc_offset_hours: -7,
            },
        }
    }
}

impl PipelineConfig {
    pub fn load() -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(PipelineConfig::default()))
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SOLARFLEET__").split("__"));
        Ok(figment.extract()?)
    }
}
