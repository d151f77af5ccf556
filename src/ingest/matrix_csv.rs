//! Two-row-header CSV telemetry tables
//!
//! The device/metric matrix export: line one labels the group or device per
//! column (often blank or repeated), line two labels the metric. Column
//! semantics come from pattern-matching the metric label; a leading integer
//! token ("1 Sungrow") marks a per-unit measurement and registers that unit
//! index so later capacity/generation columns without a device name of their
//! own ("DC Capacity 1") still attach to the right device.

use crate::domain::CellValue;
use crate::ingest::normalize::{parse_numeric, slugify};
use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Column type tag inferred from the metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Time,
    Metric,
}

/// Numeric profile of a fully-numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    /// Mean of the parseable samples; the imputation fallback for blanks.
    pub mean: f64,
}

/// One column of the matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryColumn {
    pub index: usize,
    /// Slugified, collision-disambiguated lookup key.
    pub key: String,
    pub label: String,
    /// Owning device, either from the label itself or via the unit registry.
    pub device: Option<String>,
    pub group: Option<String>,
    pub kind: ColumnKind,
    /// `Some` when every non-empty sample in the column parsed numeric.
    pub numeric: Option<ColumnStats>,
}

/// One data row keyed by column key. Rows without a parseable date never
/// make it into the table.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRow {
    pub date: NaiveDate,
    pub values: BTreeMap<String, CellValue>,
}

impl TelemetryRow {
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.values.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(CellValue::as_number)
    }
}

/// The reading column of one device plus its correlated capacity and
/// generation-per-kW columns, matched through the unit index registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceColumns {
    pub unit_index: u32,
    pub device: String,
    pub reading_key: String,
    pub capacity_key: Option<String>,
    pub generation_key: Option<String>,
}

/// Parsed matrix: header-derived columns plus date-validated rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixTable {
    pub columns: Vec<TelemetryColumn>,
    pub rows: Vec<TelemetryRow>,
}

impl MatrixTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    pub fn column(&self, key: &str) -> Option<&TelemetryColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Per-device column bundles, in column order.
    pub fn device_columns(&self) -> Vec<DeviceColumns> {
        let mut out: Vec<DeviceColumns> = Vec::new();
        for col in &self.columns {
            let Some(device) = &col.device else { continue };
            let Some(unit_index) = leading_unit_index(&col.label) else {
                // correlated columns carry the index at the tail instead
                continue;
            };
            out.push(DeviceColumns {
                unit_index,
                device: device.clone(),
                reading_key: col.key.clone(),
                capacity_key: None,
                generation_key: None,
            });
        }
        for col in &self.columns {
            let lower = col.label.to_lowercase();
            let Some(idx) = trailing_unit_index(&col.label) else {
                continue;
            };
            let Some(entry) = out.iter_mut().find(|d| d.unit_index == idx) else {
                continue;
            };
            if lower.starts_with("dc capacity") {
                entry.capacity_key = Some(col.key.clone());
            } else if lower.contains("generation per kw") {
                entry.generation_key = Some(col.key.clone());
            }
        }
        out
    }

    /// Sorted distinct dates carried by the rows.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).unique().sorted().collect()
    }
}

/// Parse a two-row-header CSV export. Read failures and truncated headers
/// degrade to an empty table; the pipeline continues on other sources.
pub fn parse(text: &str) -> MatrixTable {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records: Vec<csv::StringRecord> = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => records.push(record),
            Err(err) => {
                warn!(error = %err, "malformed matrix CSV, discarding source");
                return MatrixTable::default();
            }
        }
    }
    if records.len() < 2 {
        warn!(rows = records.len(), "matrix CSV missing header rows");
        return MatrixTable::default();
    }

    let (group_row, metric_row) = (&records[0], &records[1]);
    let data = &records[2..];

    let mut columns = build_columns(group_row, metric_row);
    scan_numeric_profiles(&mut columns, data);

    let Some(date_key) = columns
        .iter()
        .find(|c| c.kind == ColumnKind::Date)
        .map(|c| c.key.clone())
    else {
        warn!("matrix CSV has no date column, discarding source");
        return MatrixTable::default();
    };

    let mut rows = Vec::with_capacity(data.len());
    for record in data {
        match build_row(&columns, &date_key, record) {
            Some(row) => rows.push(row),
            None => debug!("dropping matrix CSV row without parseable date"),
        }
    }

    MatrixTable { columns, rows }
}

fn build_columns(group_row: &csv::StringRecord, metric_row: &csv::StringRecord) -> Vec<TelemetryColumn> {
    let width = group_row.len().max(metric_row.len());
    let mut columns = Vec::with_capacity(width);
    // unit index -> device name, filled left to right
    let mut unit_registry: HashMap<u32, String> = HashMap::new();
    let mut used_keys: HashMap<String, usize> = HashMap::new();

    for index in 0..width {
        let group = group_row.get(index).map(str::trim).filter(|s| !s.is_empty());
        let label = metric_row.get(index).map(str::trim).unwrap_or("").to_string();
        let lower = label.to_lowercase();

        let kind = match lower.as_str() {
            "date" => ColumnKind::Date,
            "time" => ColumnKind::Time,
            _ => ColumnKind::Metric,
        };

        let device = if kind == ColumnKind::Metric {
            if let Some(idx) = leading_unit_index(&label) {
                unit_registry.insert(idx, label.clone());
                Some(label.clone())
            } else {
                trailing_unit_index(&label).and_then(|idx| unit_registry.get(&idx).cloned())
            }
        } else {
            None
        };

        let base = match kind {
            // the row map must always expose the literal `date`/`time` keys
            ColumnKind::Date | ColumnKind::Time => label.clone(),
            ColumnKind::Metric => device
                .clone()
                .or_else(|| group.map(str::to_string))
                .unwrap_or_else(|| label.clone()),
        };
        let mut key = slugify(&base);
        if key.is_empty() {
            key = format!("col-{index}");
        }
        if used_keys.contains_key(&key) {
            key = format!("{key}-{index}");
        }
        used_keys.insert(key.clone(), index);

        columns.push(TelemetryColumn {
            index,
            key,
            label,
            device,
            group: group.map(str::to_string),
            kind,
            numeric: None,
        });
    }
    columns
}

/// Decide, per metric column, whether every non-empty sample parses numeric;
/// if so record the mean as the imputation fallback.
fn scan_numeric_profiles(columns: &mut [TelemetryColumn], data: &[csv::StringRecord]) {
    for col in columns.iter_mut() {
        if col.kind != ColumnKind::Metric {
            continue;
        }
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut all_numeric = true;
        for record in data {
            let raw = record.get(col.index).map(str::trim).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            match parse_numeric(raw) {
                Some(n) => {
                    sum += n;
                    count += 1;
                }
                None => {
                    all_numeric = false;
                    break;
                }
            }
        }
        if all_numeric && count > 0 {
            col.numeric = Some(ColumnStats { mean: sum / count as f64 });
        }
    }
}

fn build_row(
    columns: &[TelemetryColumn],
    date_key: &str,
    record: &csv::StringRecord,
) -> Option<TelemetryRow> {
    let date_col = columns.iter().find(|c| c.key == date_key)?;
    let raw_date = record.get(date_col.index).map(str::trim).unwrap_or("");
    let date = parse_row_date(raw_date)?;

    let mut values = BTreeMap::new();
    for col in columns {
        let raw = record.get(col.index).map(str::trim).unwrap_or("");
        let value = match col.kind {
            ColumnKind::Date => CellValue::Text(date.format("%Y-%m-%d").to_string()),
            ColumnKind::Time => CellValue::Text(raw.to_string()),
            ColumnKind::Metric => match (parse_numeric(raw), col.numeric) {
                (Some(n), _) => CellValue::Number(n),
                // blanks in a numeric column fall back to the column mean
                (None, Some(stats)) => CellValue::Number(stats.mean),
                (None, None) if raw.is_empty() => CellValue::Missing,
                (None, None) => CellValue::Text(raw.to_string()),
            },
        };
        values.insert(col.key.clone(), value);
    }
    Some(TelemetryRow { date, values })
}

/// Calendar date out of a cell that may carry several vendor formats.
fn parse_row_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    for format in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(token, format) {
            return Some(date);
        }
    }
    None
}

/// `"1 Sungrow"` -> `Some(1)`: integer token followed by text.
fn leading_unit_index(label: &str) -> Option<u32> {
    let mut parts = label.split_whitespace();
    let first = parts.next()?;
    let rest = parts.next();
    let idx = first.parse::<u32>().ok()?;
    rest.map(|_| idx)
}

/// `"DC Capacity 1"` -> `Some(1)`: trailing integer token.
fn trailing_unit_index(label: &str) -> Option<u32> {
    let last = label.split_whitespace().last()?;
    // a bare number is a reading, not a correlated column
    if last == label.trim() {
        return None;
    }
    last.parse::<u32>().ok()
}
