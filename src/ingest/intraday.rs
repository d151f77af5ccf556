//! Flat intraday JSON arrays
//!
//! One record per metric per sample: `{"timestamp": .., "value": ..,
//! "parameter_name": ".."}`. Values arrive as numbers or as strings with
//! thousands separators depending on the exporting vendor.

use crate::ingest::normalize::parse_numeric;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One raw intraday record. `value` is `None` when the cell was present but
/// unparseable; such samples carry no reading.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Unix seconds as exported, not yet minute-aligned.
    pub timestamp: i64,
    pub value: Option<f64>,
    pub parameter_name: String,
}

/// Parse a flat intraday export. Malformed JSON degrades to an empty list.
pub fn parse(text: &str) -> Vec<RawSample> {
    let items: Vec<Value> = match serde_json::from_str(text) {
        Ok(items) => items,
        Err(err) => {
            warn!(error = %err, "malformed intraday JSON, discarding source");
            return Vec::new();
        }
    };

    let mut samples = Vec::with_capacity(items.len());
    for item in &items {
        let Some(timestamp) = read_timestamp(item.get("timestamp")) else {
            debug!("skipping intraday record without usable timestamp");
            continue;
        };
        let Some(parameter_name) = item.get("parameter_name").and_then(Value::as_str) else {
            debug!("skipping intraday record without parameter name");
            continue;
        };
        samples.push(RawSample {
            timestamp,
            value: item.get("value").and_then(read_value),
            parameter_name: parameter_name.trim().to_string(),
        });
    }
    samples
}

/// Partition samples into per-parameter `(timestamp, value)` series,
/// dropping samples that carried no reading.
pub fn split_by_parameter(samples: &[RawSample]) -> BTreeMap<String, Vec<(i64, f64)>> {
    let mut series: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
    for sample in samples {
        if let Some(value) = sample.value {
            series
                .entry(sample.parameter_name.to_lowercase())
                .or_default()
                .push((sample.timestamp, value));
        }
    }
    series
}

fn read_timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn read_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_value_types() {
        let text = r#"[
            {"timestamp": 1764043200, "value": 812.5, "parameter_name": "active_power"},
            {"timestamp": 1764043200, "value": "1,050", "parameter_name": "solar_irradiation"},
            {"timestamp": "1764043260", "value": 815.0, "parameter_name": "active_power"},
            {"timestamp": 1764043260, "value": null, "parameter_name": "active_power"}
        ]"#;
        let samples = parse(text);
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[0].value, Some(812.5));
        assert_eq!(samples[1].value, Some(1050.0));
        assert_eq!(samples[2].timestamp, 1764043260);
        assert_eq!(samples[3].value, None);
    }

    #[test]
    fn test_records_without_timestamp_or_name_are_skipped() {
        let text = r#"[
            {"value": 1.0, "parameter_name": "active_power"},
            {"timestamp": 1764043200, "value": 2.0},
            {"timestamp": 1764043200, "value": 3.0, "parameter_name": "active_power"}
        ]"#;
        let samples = parse(text);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].value, Some(3.0));
    }

    #[test]
    fn test_malformed_json_degrades_to_empty() {
        assert!(parse("{not json").is_empty());
        assert!(parse("{\"a\": 1}").is_empty());
    }

    #[test]
    fn test_split_by_parameter() {
        let text = r#"[
            {"timestamp": 60, "value": 1.0, "parameter_name": "Active_Power"},
            {"timestamp": 120, "value": 2.0, "parameter_name": "active_power"},
            {"timestamp": 60, "value": 500.0, "parameter_name": "solar_irradiation"},
            {"timestamp": 120, "value": null, "parameter_name": "solar_irradiation"}
        ]"#;
        let series = split_by_parameter(&parse(text));
        assert_eq!(series["active_power"], vec![(60, 1.0), (120, 2.0)]);
        // the null sample carried no reading and was dropped
        assert_eq!(series["solar_irradiation"], vec![(60, 500.0)]);
    }
}
