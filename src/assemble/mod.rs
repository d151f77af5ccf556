//! Site assembly
//!
//! One entry point turns a catalog entry plus whatever raw telemetry exists
//! for it into a finished [`Site`]. The two real-data schemas stay distinct
//! strategies behind the [`RealDataSource`] tagged union; entries without a
//! usable source fall through to the synthetic generator, which always
//! succeeds.

pub mod buckets_site;
pub mod csv_site;
pub mod dates;
pub mod heuristics;

use crate::config::PipelineConfig;
use crate::domain::{fixed_offset_hours, CatalogEntry, EnergySeriesEntry, IntradayPoint, Site};
use crate::ingest::daily_buckets::DailyBucket;
use crate::ingest::intraday::{split_by_parameter, RawSample};
use crate::ingest::matrix_csv::MatrixTable;
use crate::series::combine::{combine_intraday, MetricSeries};
use crate::synthetic::SyntheticSiteGenerator;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

pub use dates::{AvailableDates, DateResolution, DateWindow};

/// One day's single-metric intraday series, pre-sorted by the parsers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayIntraday {
    pub active_power_kw: MetricSeries,
    pub solar_irradiation: MetricSeries,
    pub daily_energy_kwh: MetricSeries,
    pub performance_ratio_pct: Option<MetricSeries>,
}

impl DayIntraday {
    /// Sort raw samples into the four known metric slots by parameter name.
    /// Unrecognized parameters are ignored.
    pub fn from_samples(samples: &[RawSample]) -> Self {
        let mut day = DayIntraday::default();
        for (name, series) in split_by_parameter(samples) {
            if name.contains("power") {
                day.active_power_kw.extend(series);
            } else if name.contains("irrad") {
                day.solar_irradiation.extend(series);
            } else if name.contains("energy") {
                day.daily_energy_kwh.extend(series);
            } else if name.contains("performance") || name == "pr" {
                day.performance_ratio_pct.get_or_insert_with(Vec::new).extend(series);
            } else {
                debug!(parameter = %name, "ignoring unrecognized intraday parameter");
            }
        }
        day
    }

    pub fn is_empty(&self) -> bool {
        self.active_power_kw.is_empty()
            && self.solar_irradiation.is_empty()
            && self.daily_energy_kwh.is_empty()
            && self.performance_ratio_pct.as_ref().map_or(true, Vec::is_empty)
    }
}

/// Raw telemetry attached to a catalog entry, tagged by site schema.
#[derive(Debug, Clone, PartialEq)]
pub enum RealDataSource {
    CsvTelemetry {
        matrix: MatrixTable,
        intraday: BTreeMap<NaiveDate, DayIntraday>,
    },
    TaggedJsonBuckets {
        buckets: Vec<DailyBucket>,
        intraday: BTreeMap<NaiveDate, DayIntraday>,
    },
}

impl RealDataSource {
    /// A source whose parsers all degraded to nothing cannot drive assembly.
    pub fn is_usable(&self) -> bool {
        match self {
            RealDataSource::CsvTelemetry { matrix, .. } => !matrix.is_empty(),
            RealDataSource::TaggedJsonBuckets { buckets, .. } => !buckets.is_empty(),
        }
    }
}

/// Assemble one site. Never fails: unusable or missing sources fall back to
/// the synthetic generator.
pub fn assemble_site(
    entry: &CatalogEntry,
    source: Option<&RealDataSource>,
    config: &PipelineConfig,
) -> Site {
    match source {
        Some(RealDataSource::CsvTelemetry { matrix, intraday }) if !matrix.is_empty() => {
            csv_site::assemble(entry, matrix, intraday, config)
        }
        Some(RealDataSource::TaggedJsonBuckets { buckets, intraday }) if !buckets.is_empty() => {
            buckets_site::assemble(entry, buckets, intraday, config)
        }
        _ => {
            debug!(site_key = %entry.site_key, "no usable telemetry, generating synthetic site");
            SyntheticSiteGenerator::new(&config.synthetic).generate(entry)
        }
    }
}

/// The effective resolution order for a strategy, honoring the global
/// override.
pub fn effective_resolution(historical: DateResolution, config: &PipelineConfig) -> DateResolution {
    config.dates.resolution_override.unwrap_or(historical)
}

// Shared mechanics for the two real-data strategies.

pub(crate) fn combined_intraday(
    intraday: &BTreeMap<NaiveDate, DayIntraday>,
    pr_reference_capacity_kw: f64,
) -> BTreeMap<NaiveDate, Vec<IntradayPoint>> {
    intraday
        .iter()
        .filter(|(_, day)| !day.is_empty())
        .map(|(date, day)| {
            let points = combine_intraday(
                &day.active_power_kw,
                &day.solar_irradiation,
                &day.daily_energy_kwh,
                day.performance_ratio_pct.as_ref(),
                pr_reference_capacity_kw,
            );
            (*date, points)
        })
        .collect()
}

pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Freshest moment the data speaks for: the latest intraday sample, else the
/// evening of the last series day, else the configured anchor.
pub(crate) fn last_updated_from(
    intraday_by_date: &BTreeMap<NaiveDate, Vec<IntradayPoint>>,
    series: &[EnergySeriesEntry],
    config: &PipelineConfig,
) -> DateTime<FixedOffset> {
    let offset = fixed_offset_hours(config.synthetic.utc_offset_hours);

    let latest_sample = intraday_by_date
        .values()
        .flat_map(|points| points.iter().map(|p| p.timestamp))
        .max();
    if let Some(ts) = latest_sample {
        if let Some(utc) = DateTime::from_timestamp(ts, 0) {
            return utc.with_timezone(&offset);
        }
    }

    let date = series
        .last()
        .map(|entry| entry.date)
        .unwrap_or(config.synthetic.anchor_date);
    crate::synthetic::site_gen::stamp(date, 18, 0, offset)
}
