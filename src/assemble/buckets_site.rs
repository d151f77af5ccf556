//! Real-data strategy B: tagged-JSON daily buckets
//!
//! Sites whose export is the tagged-cell daily bucket JSON. Units come from
//! the distinct device names across buckets, the daily series folds the
//! buckets, and intraday lookups come from the per-day flat JSON exports
//! where available.

use super::{combined_intraday, last_updated_from, mean, DateResolution, DayIntraday};
use crate::assemble::heuristics::{
    alarms_from_series, base_history_fields, categorize_device, derive_location, derive_vendor,
};
use crate::config::PipelineConfig;
use crate::domain::{round1, round2, CatalogEntry, HistoryField, Site, Unit, UnitStatus};
use crate::ingest::daily_buckets::DailyBucket;
use crate::ingest::normalize::slugify;
use crate::series::daily;
use crate::series::metrics::cuf_pct;
use crate::synthetic::{weather_for, XorShiftSource};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Historical resolution order for this schema.
pub const DATE_RESOLUTION: DateResolution = DateResolution::ResolveThenClamp;

pub fn assemble(
    entry: &CatalogEntry,
    buckets: &[DailyBucket],
    intraday: &BTreeMap<NaiveDate, DayIntraday>,
    config: &PipelineConfig,
) -> Site {
    let units = infer_units(buckets);

    let mut series = daily::from_buckets(buckets);
    for item in &mut series {
        if let Some(energy) = item.energy_mwh {
            item.cuf_pct = cuf_pct(energy, entry.site_capacity, 1.0);
        }
    }

    let intraday_by_date =
        combined_intraday(intraday, config.performance.pr_reference_capacity_kw);
    let available_intraday_dates: Vec<NaiveDate> = if intraday_by_date.is_empty() {
        buckets.iter().map(|b| b.date).collect()
    } else {
        intraday_by_date.keys().copied().collect()
    };

    let performance_ratio_pct = mean(
        intraday_by_date
            .values()
            .flatten()
            .filter_map(|p| p.performance_ratio_pct),
    )
    .map(round1);
    let avg_availability_pct =
        mean(series.iter().filter_map(|e| e.availability_pct)).map(round1);

    let alarms = alarms_from_series(&series, &units, config.synthetic.utc_offset_hours);
    let last_updated = last_updated_from(&intraday_by_date, &series, config);

    let mut weather_rng = XorShiftSource::seeded(&entry.site_key);
    let weather = weather_for(
        &mut weather_rng,
        config.synthetic.anchor_date,
        config.synthetic.forecast_days,
    );

    Site {
        id: format!("site-{}", slugify(&entry.name)),
        site_key: entry.site_key.clone(),
        name: entry.name.clone(),
        location: derive_location(entry),
        capacity_mw: entry.site_capacity,
        status: entry.status.clone(),
        installed_at: None,
        last_updated,
        technology: vec!["Mono PERC".to_string(), "Central Inverters".to_string()],
        avg_availability_pct,
        performance_ratio_pct,
        energy_series: series,
        weather,
        units,
        alarms,
        history_fields: history_fields(buckets),
        intraday_by_date,
        available_intraday_dates,
        shared_access: Vec::new(),
    }
}

/// One unit per distinct device name, in order of first appearance. Rated
/// capacity and last output come from that device's most recent bucket
/// entry.
fn infer_units(buckets: &[DailyBucket]) -> Vec<Unit> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: BTreeMap<String, (f64, Option<f64>)> = BTreeMap::new();

    for bucket in buckets {
        for entry in &bucket.entries {
            if !latest.contains_key(&entry.unit) {
                order.push(entry.unit.clone());
            }
            // buckets are date-sorted, so later wins
            latest.insert(entry.unit.clone(), (entry.value, entry.dc_capacity_kw));
        }
    }

    order
        .into_iter()
        .map(|name| {
            let (value, capacity) = latest.get(&name).copied().unwrap_or((0.0, None));
            Unit {
                id: slugify(&name),
                unit_type: categorize_device(&name),
                vendor: derive_vendor(&name),
                rated_mw: capacity.map(|kw| round2(kw / 1000.0)).unwrap_or(0.0),
                status: UnitStatus::Online,
                last_output_mwh: round2(value / 1000.0),
                temperature_c: 0.0,
                issues: 0,
            }
        })
        .collect()
}

/// Base fields plus the aggregates this schema actually measures.
fn history_fields(buckets: &[DailyBucket]) -> Vec<HistoryField> {
    let mut fields = base_history_fields();
    fields.push(HistoryField::new("energyKWh", "Energy", Some("kWh")));
    if buckets
        .iter()
        .any(|b| b.entries.iter().any(|e| e.dc_capacity_kw.is_some()))
    {
        fields.push(HistoryField::new("totalDcCapacityKw", "DC Capacity", Some("kW")));
    }
    if buckets
        .iter()
        .any(|b| b.entries.iter().any(|e| e.generation_per_kw.is_some()))
    {
        fields.push(HistoryField::new(
            "avgGenerationPerKw",
            "Generation per kWp",
            Some("kWh/kWp"),
        ));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::daily_buckets;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            site_key: "rolling-hills".to_string(),
            name: "Rolling Hills Solar".to_string(),
            site_capacity: 36.0,
            status: "Operational".to_string(),
            coordinates: None,
            description: None,
        }
    }

    const BUCKETS: &str = r#"{
        "rows": [
            [
                {"Data": "Date", "value": "2025-11-01"},
                {"Data": "1 Sungrow SG3125", "value": "9,100"},
                {"Data": "DC Capacity 1", "value": 3125},
                {"Data": "Generation Per kW 1", "value": 2.9}
            ],
            [
                {"Data": "Date", "value": "2025-11-02"},
                {"Data": "1 Sungrow SG3125", "value": 9800},
                {"Data": "DC Capacity 1", "value": 3125}
            ]
        ]
    }"#;

    #[test]
    fn test_units_from_bucket_devices() {
        let buckets = daily_buckets::parse(BUCKETS);
        let site = assemble(&entry(), &buckets, &BTreeMap::new(), &PipelineConfig::default());

        assert_eq!(site.units.len(), 1);
        let unit = &site.units[0];
        assert_eq!(unit.id, "1-sungrow-sg3125");
        assert_eq!(unit.vendor, "Sungrow");
        assert_eq!(unit.rated_mw, 3.13);
        // last bucket's reading, in MWh
        assert_eq!(unit.last_output_mwh, 9.8);
    }

    #[test]
    fn test_series_and_history_fields() {
        let buckets = daily_buckets::parse(BUCKETS);
        let site = assemble(&entry(), &buckets, &BTreeMap::new(), &PipelineConfig::default());

        assert_eq!(site.energy_series.len(), 2);
        assert_eq!(site.energy_series[0].energy_kwh, Some(9100.0));
        assert!(site.energy_series[0].cuf_pct.is_some());
        assert_eq!(site.location, "Location unavailable");

        let keys: Vec<&str> = site.history_fields.iter().map(|f| f.key.as_str()).collect();
        assert!(keys.contains(&"totalDcCapacityKw"));
        assert!(keys.contains(&"avgGenerationPerKw"));
    }

    #[test]
    fn test_available_dates_fall_back_to_bucket_dates() {
        let buckets = daily_buckets::parse(BUCKETS);
        let site = assemble(&entry(), &buckets, &BTreeMap::new(), &PipelineConfig::default());
        assert_eq!(site.available_intraday_dates.len(), 2);
    }
}
