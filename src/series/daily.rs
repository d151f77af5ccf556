//! Daily aggregate builders
//!
//! Two site schemas feed the daily energy table and they aggregate
//! differently: tagged-JSON buckets already hold one meter reading per
//! device per day, while the matrix CSV carries intraday counter samples
//! that first reduce to a per-day figure. Both builders stay separate and
//! produce the same record shape; fields a schema cannot supply remain
//! `None` so a missing measurement never reads as zero downstream.

use crate::domain::{round2, EnergySeriesEntry};
use crate::ingest::daily_buckets::DailyBucket;
use crate::ingest::matrix_csv::MatrixTable;
use itertools::Itertools;

/// Fold tagged-JSON buckets into daily entries.
///
/// Energy is the sum of all device readings (kWh), capacity the sum of the
/// reported DC-capacity cells, and generation-per-kW the mean over the
/// entries that actually report it.
pub fn from_buckets(buckets: &[DailyBucket]) -> Vec<EnergySeriesEntry> {
    buckets
        .iter()
        .map(|bucket| {
            let energy_kwh: f64 = bucket.entries.iter().map(|e| e.value).sum();
            let capacity_kw: f64 = bucket
                .entries
                .iter()
                .filter_map(|e| e.dc_capacity_kw)
                .sum();

            let generation: Vec<f64> = bucket
                .entries
                .iter()
                .filter_map(|e| e.generation_per_kw)
                .collect();
            let avg_generation = mean(&generation).map(round2);

            let mut entry = EnergySeriesEntry::empty(bucket.date);
            entry.energy_kwh = Some(round2(energy_kwh));
            entry.energy_mwh = Some(round2(energy_kwh / 1000.0));
            entry.total_dc_capacity_kw = capacity_kw.round();
            entry.total_dc_capacity_mw = round2(capacity_kw / 1000.0);
            entry.avg_generation_per_kw = avg_generation;
            entry
        })
        .collect()
}

/// Reduce matrix-CSV rows into daily entries.
///
/// The per-unit reading columns are cumulative daily counters, so a day's
/// figure per device is the highest sample of that day. Capacity columns are
/// nameplate constants and taken from the column profile.
pub fn from_matrix(table: &MatrixTable) -> Vec<EnergySeriesEntry> {
    let devices = table.device_columns();

    let by_date = table.rows.iter().into_group_map_by(|row| row.date);

    by_date
        .into_iter()
        .sorted_by_key(|(date, _)| *date)
        .map(|(date, rows)| {
            let mut energy_kwh = 0.0;
            let mut saw_reading = false;
            let mut capacity_kw = 0.0;
            let mut generation: Vec<f64> = Vec::new();

            for device in &devices {
                let day_max = rows
                    .iter()
                    .filter_map(|row| row.number(&device.reading_key))
                    .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))));
                if let Some(value) = day_max {
                    energy_kwh += value;
                    saw_reading = true;
                }

                if let Some(key) = &device.capacity_key {
                    if let Some(stats) = table.column(key).and_then(|c| c.numeric) {
                        capacity_kw += stats.mean;
                    }
                }
                if let Some(key) = &device.generation_key {
                    let samples: Vec<f64> =
                        rows.iter().filter_map(|row| row.number(key)).collect();
                    if let Some(avg) = mean(&samples) {
                        generation.push(avg);
                    }
                }
            }

            let mut entry = EnergySeriesEntry::empty(date);
            if saw_reading {
                entry.energy_kwh = Some(round2(energy_kwh));
                entry.energy_mwh = Some(round2(energy_kwh / 1000.0));
            }
            entry.total_dc_capacity_kw = capacity_kw.round();
            entry.total_dc_capacity_mw = round2(capacity_kw / 1000.0);
            entry.avg_generation_per_kw = mean(&generation).map(round2);
            entry
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::daily_buckets::BucketEntry;
    use crate::ingest::matrix_csv;

    fn bucket(date: &str, entries: Vec<BucketEntry>) -> DailyBucket {
        DailyBucket {
            date: date.parse().unwrap(),
            entries,
        }
    }

    fn entry(value: f64, capacity: Option<f64>, generation: Option<f64>) -> BucketEntry {
        BucketEntry {
            unit: "1 Sungrow".to_string(),
            value,
            dc_capacity_kw: capacity,
            generation_per_kw: generation,
        }
    }

    #[test]
    fn test_bucket_sum_without_capacity() {
        let series = from_buckets(&[bucket(
            "2025-11-01",
            vec![entry(100.0, None, None), entry(200.0, None, None)],
        )]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].energy_kwh, Some(300.0));
        assert_eq!(series[0].energy_mwh, Some(0.3));
        assert_eq!(series[0].total_dc_capacity_kw, 0.0);
        assert_eq!(series[0].avg_generation_per_kw, None);
        // unknowns stay unknown, not zero
        assert_eq!(series[0].availability_pct, None);
        assert_eq!(series[0].performance_ratio_pct, None);
        assert_eq!(series[0].irradiance_whm2, None);
    }

    #[test]
    fn test_bucket_capacity_and_generation_aggregation() {
        let series = from_buckets(&[bucket(
            "2025-11-01",
            vec![
                entry(9000.0, Some(3125.0), Some(3.8)),
                entry(8600.0, Some(3125.0), None),
            ],
        )]);
        assert_eq!(series[0].total_dc_capacity_kw, 6250.0);
        assert_eq!(series[0].total_dc_capacity_mw, 6.25);
        // only the reporting entry participates in the average
        assert_eq!(series[0].avg_generation_per_kw, Some(3.8));
    }

    #[test]
    fn test_matrix_counter_reduction() {
        let text = "\
,,Inverters,Inverters\n\
Date,Time,1 Sungrow,DC Capacity 1\n\
2025-01-01,06:00,150,500\n\
2025-01-01,12:00,410,500\n\
2025-01-02,06:00,120,500\n";
        let table = matrix_csv::parse(text);
        let series = from_matrix(&table);

        assert_eq!(series.len(), 2);
        // cumulative counter: the day's energy is the highest sample
        assert_eq!(series[0].energy_kwh, Some(410.0));
        assert_eq!(series[0].total_dc_capacity_kw, 500.0);
        assert_eq!(series[1].energy_kwh, Some(120.0));
    }

    #[test]
    fn test_matrix_without_device_columns() {
        let text = "\
,Station\n\
Date,Ambient Temp\n\
2025-01-01,21.4\n";
        let series = from_matrix(&matrix_csv::parse(text));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].energy_kwh, None);
        assert_eq!(series[0].total_dc_capacity_kw, 0.0);
    }
}
