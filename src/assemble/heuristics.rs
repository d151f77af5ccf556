//! Shared assembly heuristics
//!
//! Both real-data site schemas need the same inferences: what kind of device
//! a name describes, who built it, which days deserve an alarm and which
//! columns the history table should show. Extracted here so the two
//! strategies stay thin.

use crate::domain::{
    fixed_offset_hours, Alarm, CatalogEntry, EnergySeriesEntry, HistoryField, Severity, Unit,
    UnitType,
};
use crate::ingest::matrix_csv::{ColumnKind, TelemetryColumn};
use chrono::NaiveDate;
use once_cell::sync::Lazy;

static VENDOR_PATTERNS: Lazy<Vec<(&'static str, &'static str)>> = Lazy::new(|| {
    vec![
        ("sungrow", "Sungrow"),
        ("sma", "SMA"),
        ("huawei", "Huawei"),
        ("abb", "ABB"),
        ("vaisala", "Vaisala"),
        ("campbell", "Campbell"),
        ("secure", "Secure"),
        ("schneider", "Schneider"),
    ]
});

/// Device category from its free-text name.
pub fn categorize_device(name: &str) -> UnitType {
    let lower = name.to_lowercase();
    if lower.contains("meter") {
        UnitType::EnergyMeter
    } else if lower.contains("wms") || lower.contains("weather") {
        UnitType::WeatherStation
    } else if lower.contains("sungrow") || lower.contains("inverter") || starts_with_unit_index(&lower)
    {
        UnitType::CentralInverter
    } else {
        UnitType::Auxiliary
    }
}

fn starts_with_unit_index(lower: &str) -> bool {
    let mut parts = lower.split_whitespace();
    matches!(
        (parts.next().map(|p| p.parse::<u32>().is_ok()), parts.next()),
        (Some(true), Some(_))
    )
}

/// Vendor from name heuristics; `Unknown` when nothing matches.
pub fn derive_vendor(name: &str) -> String {
    let lower = name.to_lowercase();
    VENDOR_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, vendor)| (*vendor).to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Display location: coordinates when fully populated, else the free-text
/// description, else a fixed placeholder.
pub fn derive_location(entry: &CatalogEntry) -> String {
    if let Some((lat, lon)) = entry.coordinates.as_ref().and_then(|c| c.fully_populated()) {
        return format!("{lat:.4}, {lon:.4}");
    }
    if let Some(description) = entry.description.as_ref().map(|d| d.trim()) {
        if !description.is_empty() {
            return description.to_string();
        }
    }
    "Location unavailable".to_string()
}

/// Alarms out of the daily energy series.
///
/// A day qualifies when its energy falls below 80% of the series average;
/// the last three qualifying days get alarms (High under 60%, Medium
/// otherwise). When no day qualifies the last three days overall get a Low
/// advisory instead, so a freshly connected site is never alarm-free while
/// its data is still being vetted.
pub fn alarms_from_series(
    series: &[EnergySeriesEntry],
    units: &[Unit],
    utc_offset_hours: i32,
) -> Vec<Alarm> {
    let energies: Vec<(NaiveDate, f64)> = series
        .iter()
        .filter_map(|entry| daily_energy_mwh(entry).map(|e| (entry.date, e)))
        .collect();
    if energies.is_empty() {
        return Vec::new();
    }
    let average = energies.iter().map(|(_, e)| e).sum::<f64>() / energies.len() as f64;

    let qualifying: Vec<(NaiveDate, f64)> = energies
        .iter()
        .filter(|(_, e)| *e < average * 0.8)
        .copied()
        .collect();

    let inverters: Vec<&Unit> = units
        .iter()
        .filter(|u| u.unit_type == UnitType::CentralInverter)
        .collect();
    let unit_id_for = |i: usize| -> String {
        inverters
            .get(i % inverters.len().max(1))
            .map(|u| u.id.clone())
            .or_else(|| units.first().map(|u| u.id.clone()))
            .unwrap_or_else(|| "site".to_string())
    };

    let offset = fixed_offset_hours(utc_offset_hours);
    let alarm_at = |date: NaiveDate| {
        date.and_hms_opt(18, 0, 0)
            .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
            .and_local_timezone(offset)
            .single()
    };

    let mut alarms = Vec::new();
    if qualifying.is_empty() {
        for (i, (date, _)) in energies.iter().rev().take(3).rev().enumerate() {
            let Some(triggered_at) = alarm_at(*date) else { continue };
            alarms.push(Alarm {
                id: format!("alm-{:04}", 7000 + i),
                unit_id: unit_id_for(i),
                severity: Severity::Low,
                message: "Generation trending below recent average".to_string(),
                triggered_at,
                acknowledged_by: None,
                resolved_at: None,
            });
        }
        return alarms;
    }

    for (i, (date, energy)) in qualifying.iter().rev().take(3).rev().enumerate() {
        let Some(triggered_at) = alarm_at(*date) else { continue };
        let severity = if *energy < average * 0.6 {
            Severity::High
        } else {
            Severity::Medium
        };
        alarms.push(Alarm {
            id: format!("alm-{:04}", 7000 + i),
            unit_id: unit_id_for(i),
            severity,
            message: "Daily generation below 80% of trailing average".to_string(),
            triggered_at,
            acknowledged_by: None,
            resolved_at: None,
        });
    }
    alarms
}

fn daily_energy_mwh(entry: &EnergySeriesEntry) -> Option<f64> {
    entry
        .energy_mwh
        .or_else(|| entry.energy_kwh.map(|kwh| kwh / 1000.0))
}

/// The fixed leading columns of the history table, in display order.
pub fn base_history_fields() -> Vec<HistoryField> {
    vec![
        HistoryField::new("date", "Date", None),
        HistoryField::new("energyMWh", "Energy", Some("MWh")),
        HistoryField::new("peakPowerMw", "Peak Power", Some("MW")),
        HistoryField::new("availabilityPct", "Availability", Some("%")),
        HistoryField::new("performanceRatioPct", "Performance Ratio", Some("%")),
        HistoryField::new("irradianceWhm2", "Irradiance", Some("Wh/m²")),
        HistoryField::new("cufPct", "CUF", Some("%")),
    ]
}

/// Base fields plus the raw telemetry columns, skipping columns whose label
/// duplicates CUF or availability already covered by a base field.
pub fn history_fields_with_columns(columns: &[TelemetryColumn]) -> Vec<HistoryField> {
    let mut fields = base_history_fields();
    for column in columns {
        if column.kind != ColumnKind::Metric {
            continue;
        }
        let lower = column.label.to_lowercase();
        if lower.contains("cuf") || lower.contains("availability") {
            continue;
        }
        let unit = if lower.contains("capacity") || lower.contains("kw") {
            Some("kW")
        } else {
            None
        };
        fields.push(HistoryField::new(&column.key, &column.label, unit));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnitStatus;
    use rstest::rstest;

    #[rstest]
    #[case("1 Sungrow SG3125", UnitType::CentralInverter)]
    #[case("Central Inverter 2", UnitType::CentralInverter)]
    #[case("Main Energy Meter", UnitType::EnergyMeter)]
    #[case("WMS Station", UnitType::WeatherStation)]
    #[case("Site Weather Sensor", UnitType::WeatherStation)]
    #[case("Aux Transformer", UnitType::Auxiliary)]
    fn test_categorize_device(#[case] name: &str, #[case] expected: UnitType) {
        assert_eq!(categorize_device(name), expected);
    }

    #[rstest]
    #[case("1 Sungrow SG3125", "Sungrow")]
    #[case("SMA Core 2", "SMA")]
    #[case("Vaisala WXT530", "Vaisala")]
    #[case("Mystery Box", "Unknown")]
    fn test_derive_vendor(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(derive_vendor(name), expected);
    }

    fn catalog_entry(
        coordinates: Option<crate::domain::Coordinates>,
        description: Option<&str>,
    ) -> CatalogEntry {
        CatalogEntry {
            site_key: "k".to_string(),
            name: "n".to_string(),
            site_capacity: 10.0,
            status: "Operational".to_string(),
            coordinates,
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn test_derive_location_precedence() {
        use crate::domain::Coordinates;

        let coords = catalog_entry(
            Some(Coordinates {
                latitude: Some(33.4484),
                longitude: Some(-112.074),
            }),
            Some("Phoenix, AZ"),
        );
        assert_eq!(derive_location(&coords), "33.4484, -112.0740");

        let partial = catalog_entry(
            Some(Coordinates {
                latitude: Some(33.4484),
                longitude: None,
            }),
            Some("Phoenix, AZ"),
        );
        assert_eq!(derive_location(&partial), "Phoenix, AZ");

        let bare = catalog_entry(None, None);
        assert_eq!(derive_location(&bare), "Location unavailable");
    }

    fn series_with_energies(energies: &[f64]) -> Vec<EnergySeriesEntry> {
        energies
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let date = NaiveDate::from_ymd_opt(2025, 11, i as u32 + 1).unwrap();
                let mut entry = EnergySeriesEntry::empty(date);
                entry.energy_mwh = Some(*e);
                entry
            })
            .collect()
    }

    fn inverter(id: &str) -> Unit {
        Unit {
            id: id.to_string(),
            unit_type: UnitType::CentralInverter,
            vendor: "Sungrow".to_string(),
            rated_mw: 3.1,
            status: UnitStatus::Online,
            last_output_mwh: 0.0,
            temperature_c: 40.0,
            issues: 0,
        }
    }

    #[test]
    fn test_alarms_pick_last_three_qualifying_days() {
        // average 95; days 2, 5, 9 and 13 fall under the 80% line
        let series = series_with_energies(&[
            110.0, 40.0, 105.0, 108.0, 70.0, 112.0, 109.0, 111.0, 75.0, 110.0, 108.0, 112.0, 55.0,
            105.0,
        ]);
        let units = vec![inverter("inv-1")];
        let alarms = alarms_from_series(&series, &units, -7);

        assert_eq!(alarms.len(), 3);
        let dates: Vec<u32> = alarms
            .iter()
            .map(|a| chrono::Datelike::day(&a.triggered_at.date_naive()))
            .collect();
        // the last three qualifying days, oldest first
        assert_eq!(dates, vec![5, 9, 13]);
        // day 13 at 55 is under 60% of the average
        assert_eq!(alarms[2].severity, Severity::High);
        assert_eq!(alarms[0].severity, Severity::Medium);
        assert!(alarms.iter().all(|a| a.acknowledged_by.is_none()));
    }

    #[test]
    fn test_alarm_fallback_when_no_day_qualifies() {
        let series = series_with_energies(&[100.0, 101.0, 99.0, 100.0, 102.0]);
        let units = vec![inverter("inv-1")];
        let alarms = alarms_from_series(&series, &units, -7);

        assert_eq!(alarms.len(), 3);
        assert!(alarms.iter().all(|a| a.severity == Severity::Low));
    }

    #[test]
    fn test_alarms_empty_series() {
        assert!(alarms_from_series(&[], &[inverter("inv-1")], 0).is_empty());
    }

    #[test]
    fn test_history_fields_exclude_duplicate_columns() {
        let table = crate::ingest::matrix_csv::parse(
            "\
,,Inverters,Derived,Derived\n\
Date,Time,1 Sungrow,Plant Availability,CUF Actual\n\
2025-01-01,06:00,150,99.1,17.2\n",
        );
        let fields = history_fields_with_columns(&table.columns);
        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();

        // base fields lead in fixed order
        assert_eq!(keys[0], "date");
        assert_eq!(keys[1], "energyMWh");
        // the telemetry reading column is appended
        assert!(keys.contains(&"1-sungrow"));
        // availability/CUF-flavored columns are dropped as duplicates
        assert!(!fields.iter().any(|f| f.label == "Plant Availability"));
        assert!(!fields.iter().any(|f| f.label == "CUF Actual"));
    }
}
