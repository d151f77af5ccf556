//! Real-data strategy A: matrix-CSV telemetry
//!
//! Sites whose daily export is the two-row-header device/metric matrix.
//! Units are inferred from the per-unit columns, the daily series reduces
//! the matrix counters, and the intraday lookups come from the per-day flat
//! JSON exports.

use super::{combined_intraday, last_updated_from, mean, DateResolution, DayIntraday};
use crate::assemble::heuristics::{
    alarms_from_series, categorize_device, derive_location, derive_vendor,
    history_fields_with_columns,
};
use crate::config::PipelineConfig;
use crate::domain::{round1, round2, CatalogEntry, Site, Unit, UnitStatus, UnitType};
use crate::ingest::matrix_csv::{ColumnKind, MatrixTable};
use crate::ingest::normalize::slugify;
use crate::series::daily;
use crate::series::metrics::cuf_pct;
use crate::synthetic::{weather_for, XorShiftSource};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Historical resolution order for this schema.
pub const DATE_RESOLUTION: DateResolution = DateResolution::ClampThenResolve;

pub fn assemble(
    entry: &CatalogEntry,
    matrix: &MatrixTable,
    intraday: &BTreeMap<NaiveDate, DayIntraday>,
    config: &PipelineConfig,
) -> Site {
    let units = infer_units(matrix);

    let mut series = daily::from_matrix(matrix);
    for item in &mut series {
        if let Some(energy) = item.energy_mwh {
            item.cuf_pct = cuf_pct(energy, entry.site_capacity, 1.0);
        }
    }

    let intraday_by_date =
        combined_intraday(intraday, config.performance.pr_reference_capacity_kw);
    let available_intraday_dates: Vec<NaiveDate> = if intraday_by_date.is_empty() {
        matrix.dates()
    } else {
        intraday_by_date.keys().copied().collect()
    };

    let performance_ratio_pct = mean(
        intraday_by_date
            .values()
            .flatten()
            .filter_map(|p| p.performance_ratio_pct),
    )
    .or_else(|| mean(series.iter().filter_map(|e| e.performance_ratio_pct)))
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
        history_fields: history_fields_with_columns(&matrix.columns),
        intraday_by_date,
        available_intraday_dates,
        shared_access: Vec::new(),
    }
}

/// Units out of the telemetry columns: one per registered device, plus a
/// meter and a weather station when the header mentions them.
fn infer_units(matrix: &MatrixTable) -> Vec<Unit> {
    let mut units = Vec::new();

    for device in matrix.device_columns() {
        let rated_mw = device
            .capacity_key
            .as_deref()
            .and_then(|key| matrix.column(key))
            .and_then(|col| col.numeric)
            .map(|stats| round2(stats.mean / 1000.0))
            .unwrap_or(0.0);

        let last_output_mwh = matrix
            .rows
            .iter()
            .rev()
            .find_map(|row| row.number(&device.reading_key))
            .map(|kwh| round2(kwh / 1000.0))
            .unwrap_or(0.0);

        units.push(Unit {
            id: slugify(&device.device),
            unit_type: categorize_device(&device.device),
            vendor: derive_vendor(&device.device),
            rated_mw,
            status: UnitStatus::Online,
            last_output_mwh,
            temperature_c: 0.0,
            issues: 0,
        });
    }

    // auxiliary columns can reveal a meter or weather station
    let mut saw_meter = false;
    let mut saw_station = false;
    for column in &matrix.columns {
        if column.kind != ColumnKind::Metric || column.device.is_some() {
            continue;
        }
        let text = format!(
            "{} {}",
            column.group.as_deref().unwrap_or(""),
            column.label
        );
        match categorize_device(&text) {
            UnitType::EnergyMeter if !saw_meter => {
                saw_meter = true;
                units.push(Unit {
                    id: "energy-meter".to_string(),
                    unit_type: UnitType::EnergyMeter,
                    vendor: derive_vendor(&text),
                    rated_mw: 0.0,
                    status: UnitStatus::Online,
                    last_output_mwh: 0.0,
                    temperature_c: 0.0,
                    issues: 0,
                });
            }
            UnitType::WeatherStation if !saw_station => {
                saw_station = true;
                units.push(Unit {
                    id: "weather-station".to_string(),
                    unit_type: UnitType::WeatherStation,
                    vendor: derive_vendor(&text),
                    rated_mw: 0.0,
                    status: UnitStatus::Online,
                    last_output_mwh: 0.0,
                    temperature_c: 0.0,
                    issues: 0,
                });
            }
            _ => {}
        }
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::matrix_csv;

    fn entry() -> CatalogEntry {
        CatalogEntry {
            site_key: "desert-bloom".to_string(),
            name: "Desert Bloom Solar".to_string(),
            site_capacity: 42.0,
            status: "Operational".to_string(),
            coordinates: None,
            description: Some("Phoenix, AZ".to_string()),
        }
    }

    const MATRIX: &str = "\
,,Inverters,Inverters,WMS\n\
Date,Time,1 Sungrow,DC Capacity 1,WMS Irradiance\n\
2025-01-01,06:00,150,500,210\n\
2025-01-01,12:00,410,500,890\n";

    #[test]
    fn test_unit_inference_from_columns() {
        let site = assemble(&entry(), &matrix_csv::parse(MATRIX), &BTreeMap::new(), &PipelineConfig::default());

        let inverter = site
            .units
            .iter()
            .find(|u| u.unit_type == UnitType::CentralInverter)
            .expect("inverter unit");
        assert_eq!(inverter.id, "1-sungrow");
        assert_eq!(inverter.vendor, "Sungrow");
        // rated capacity derived from the 500 kW capacity column
        assert_eq!(inverter.rated_mw, 0.5);
        assert_eq!(inverter.last_output_mwh, 0.41);

        assert!(site
            .units
            .iter()
            .any(|u| u.unit_type == UnitType::WeatherStation));
    }

    #[test]
    fn test_series_and_identity() {
        let site = assemble(&entry(), &matrix_csv::parse(MATRIX), &BTreeMap::new(), &PipelineConfig::default());

        assert_eq!(site.id, "site-desert-bloom-solar");
        assert_eq!(site.location, "Phoenix, AZ");
        assert_eq!(site.energy_series.len(), 1);
        assert_eq!(site.energy_series[0].energy_kwh, Some(410.0));
        assert!(site.energy_series[0].cuf_pct.is_some());
        // without intraday files, the matrix dates drive availability
        assert_eq!(site.available_intraday_dates.len(), 1);
    }

    #[test]
    fn test_history_fields_carry_telemetry_columns() {
        let site = assemble(&entry(), &matrix_csv::parse(MATRIX), &BTreeMap::new(), &PipelineConfig::default());
        assert!(site.history_fields.iter().any(|f| f.key == "1-sungrow"));
        assert_eq!(site.history_fields[0].key, "date");
    }
}
