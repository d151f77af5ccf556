//! Tagged-cell JSON daily buckets
//!
//! The vendor's daily export tags every cell with a `Data` label and a
//! `value`. Two historical shapes are in circulation: the newer one is a
//! `rows` array of cell arrays where a `Date` cell names the day, the legacy
//! one maps date strings straight to cell arrays, sometimes nested one level
//! under a numeric outer key. Both are folded into the same bucket records.

use crate::ingest::normalize::parse_numeric;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

/// One calendar day's device readings.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub entries: Vec<BucketEntry>,
}

/// One device reading inside a bucket, with the capacity/generation cells
/// that followed it in the export when present.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEntry {
    pub unit: String,
    pub value: f64,
    pub dc_capacity_kw: Option<f64>,
    pub generation_per_kw: Option<f64>,
}

/// Parse either bucket shape. Malformed JSON degrades to an empty list.
pub fn parse(text: &str) -> Vec<DailyBucket> {
    let root: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "malformed daily bucket JSON, discarding source");
            return Vec::new();
        }
    };

    let mut buckets = if let Some(rows) = root.get("rows").and_then(Value::as_array) {
        parse_rows_shape(rows)
    } else if let Some(map) = root.as_object() {
        parse_legacy_shape(map)
    } else {
        warn!("daily bucket JSON has an unrecognized top-level shape");
        Vec::new()
    };

    buckets.sort_by_key(|b| b.date);
    buckets
}

fn parse_rows_shape(rows: &[Value]) -> Vec<DailyBucket> {
    let mut buckets = Vec::new();
    for row in rows {
        let Some(cells) = row.as_array() else { continue };
        let tagged = tagged_cells(cells);

        let Some(date) = tagged
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case("date"))
            .and_then(|(_, value)| cell_date(value))
        else {
            debug!("skipping bucket row without a date cell");
            continue;
        };

        buckets.push(DailyBucket {
            date,
            entries: collect_entries(&tagged),
        });
    }
    buckets
}

fn parse_legacy_shape(map: &serde_json::Map<String, Value>) -> Vec<DailyBucket> {
    // the legacy export sometimes wraps the date map one level deep under
    // numeric keys
    let date_maps: Vec<&serde_json::Map<String, Value>> =
        if map.keys().all(|k| k.parse::<u64>().is_ok()) && !map.is_empty() {
            map.values().filter_map(Value::as_object).collect()
        } else {
            vec![map]
        };

    let mut buckets = Vec::new();
    for date_map in date_maps {
        for (raw_date, cells) in date_map {
            let Some(date) = parse_bucket_date(raw_date) else {
                debug!(key = %raw_date, "skipping legacy bucket with unparseable date key");
                continue;
            };
            let Some(cells) = cells.as_array() else { continue };
            let tagged = tagged_cells(cells);
            buckets.push(DailyBucket {
                date,
                entries: collect_entries(&tagged),
            });
        }
    }
    buckets
}

/// Pull `(label, value)` out of each `{"Data": .., "value": ..}` cell.
fn tagged_cells(cells: &[Value]) -> Vec<(String, &Value)> {
    cells
        .iter()
        .filter_map(|cell| {
            let label = cell.get("Data").and_then(Value::as_str)?;
            let value = cell.get("value")?;
            Some((label.trim().to_string(), value))
        })
        .collect()
}

/// Walk the tagged cells, emitting one entry per inverter reading. An
/// inverter cell greedily consumes the next one or two cells when they carry
/// its capacity or generation-per-kW reading.
fn collect_entries(tagged: &[(String, &Value)]) -> Vec<BucketEntry> {
    let mut entries = Vec::new();
    let mut i = 0;
    while i < tagged.len() {
        let (label, value) = &tagged[i];
        if !label.to_lowercase().contains("sungrow") {
            i += 1;
            continue;
        }
        let Some(reading) = cell_number(value) else {
            i += 1;
            continue;
        };

        let mut entry = BucketEntry {
            unit: label.clone(),
            value: reading,
            dc_capacity_kw: None,
            generation_per_kw: None,
        };
        let mut consumed = 0;
        while consumed < 2 && i + 1 + consumed < tagged.len() {
            let (next_label, next_value) = &tagged[i + 1 + consumed];
            let lower = next_label.to_lowercase();
            if lower == "dc capacity 1" && entry.dc_capacity_kw.is_none() {
                entry.dc_capacity_kw = cell_number(next_value);
            } else if lower.contains("generation per kw") && entry.generation_per_kw.is_none() {
                entry.generation_per_kw = cell_number(next_value);
            } else {
                break;
            }
            consumed += 1;
        }
        entries.push(entry);
        i += 1 + consumed;
    }
    entries
}

fn cell_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

fn cell_date(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(parse_bucket_date)
}

fn parse_bucket_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.trim().split_whitespace().next()?;
    for format in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS_SHAPE: &str = r#"{
        "rows": [
            [
                {"Data": "Date", "value": "2025-11-01"},
                {"Data": "1 Sungrow SG3125", "value": "12,400"},
                {"Data": "DC Capacity 1", "value": 3125},
                {"Data": "Generation Per kW 1", "value": "3.97"},
                {"Data": "2 Sungrow SG3125", "value": 11800},
                {"Data": "Grid Export", "value": "23,900"}
            ],
            [
                {"Data": "Date", "value": "2025-11-02"},
                {"Data": "1 Sungrow SG3125", "value": 13000}
            ]
        ]
    }"#;

    #[test]
    fn test_rows_shape_dates_and_entries() {
        let buckets = parse(ROWS_SHAPE);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        assert_eq!(buckets[0].entries.len(), 2);

        let first = &buckets[0].entries[0];
        assert_eq!(first.unit, "1 Sungrow SG3125");
        assert_eq!(first.value, 12400.0);
        assert_eq!(first.dc_capacity_kw, Some(3125.0));
        assert_eq!(first.generation_per_kw, Some(3.97));

        // the second inverter has no adjacent capacity/generation cells
        let second = &buckets[0].entries[1];
        assert_eq!(second.value, 11800.0);
        assert_eq!(second.dc_capacity_kw, None);
        assert_eq!(second.generation_per_kw, None);
    }

    #[test]
    fn test_rows_shape_greedy_consumption_stops_at_other_cells() {
        let buckets = parse(ROWS_SHAPE);
        // "Grid Export" is not an inverter and was not swallowed as an
        // adjacent cell
        assert_eq!(buckets[0].entries.len(), 2);
        assert_eq!(buckets[1].entries.len(), 1);
        assert_eq!(buckets[1].entries[0].dc_capacity_kw, None);
    }

    #[test]
    fn test_legacy_shape() {
        let text = r#"{
            "2025-11-01": [
                {"Data": "1 Sungrow SG2500", "value": "9,100"},
                {"Data": "DC Capacity 1", "value": "2500"}
            ],
            "2025-11-03": [
                {"Data": "1 Sungrow SG2500", "value": 8400}
            ]
        }"#;
        let buckets = parse(text);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        assert_eq!(buckets[0].entries[0].dc_capacity_kw, Some(2500.0));
        assert_eq!(buckets[1].date, NaiveDate::from_ymd_opt(2025, 11, 3).unwrap());
    }

    #[test]
    fn test_legacy_shape_nested_under_numeric_key() {
        let text = r#"{
            "0": {
                "01-11-2025": [
                    {"Data": "1 Sungrow SG2500", "value": 9100}
                ]
            }
        }"#;
        let buckets = parse(text);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
    }

    #[test]
    fn test_malformed_json_degrades_to_empty() {
        assert!(parse("{not json").is_empty());
        assert!(parse("[1,2,3]").is_empty());
        assert!(parse("null").is_empty());
    }

    #[test]
    fn test_unparseable_dates_are_skipped() {
        let text = r#"{
            "not-a-date": [
                {"Data": "1 Sungrow", "value": 100}
            ]
        }"#;
        assert!(parse(text).is_empty());
    }

    #[test]
    fn test_buckets_sorted_by_date() {
        let text = r#"{
            "2025-11-05": [{"Data": "1 Sungrow", "value": 2}],
            "2025-11-01": [{"Data": "1 Sungrow", "value": 1}]
        }"#;
        let buckets = parse(text);
        assert_eq!(buckets[0].date, NaiveDate::from_ymd_opt(2025, 11, 1).unwrap());
        assert_eq!(buckets[1].date, NaiveDate::from_ymd_opt(2025, 11, 5).unwrap());
    }
}
