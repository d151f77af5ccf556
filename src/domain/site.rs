//! Fleet data model
//!
//! Everything the ingestion pipeline hands to the presentation layer: sites,
//! their units and alarms, daily energy series, intraday lookups and the
//! fleet-wide benchmark summary. All of it is plain serializable data; the
//! pipeline constructs these once per run and never mutates them afterwards.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Catalog
// ============================================================================

/// Static metadata for one site, independent of any telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub site_key: String,
    pub name: String,
    /// Nameplate capacity in MW.
    pub site_capacity: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Possibly-partial coordinates from the catalog. Location derivation only
/// trusts them when both halves are present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Coordinates {
    pub fn fully_populated(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

// ============================================================================
// Units
// ============================================================================

/// Category of a monitored device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum UnitType {
    #[serde(rename = "Central Inverter")]
    #[strum(serialize = "Central Inverter")]
    CentralInverter,
    #[serde(rename = "Energy Meter")]
    #[strum(serialize = "Energy Meter")]
    EnergyMeter,
    #[serde(rename = "Weather Station")]
    #[strum(serialize = "Weather Station")]
    WeatherStation,
    Auxiliary,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum UnitStatus {
    Online,
    Warning,
    Maintenance,
    Offline,
}

/// A monitored device. Constructed once at site-assembly time and never
/// mutated by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    #[serde(rename = "type")]
    pub unit_type: UnitType,
    pub vendor: String,
    pub rated_mw: f64,
    pub status: UnitStatus,
    pub last_output_mwh: f64,
    pub temperature_c: f64,
    pub issues: u32,
}

// ============================================================================
// Alarms
// ============================================================================

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alarm lifecycle after creation (acknowledge, resolve) belongs to the
/// external store; the pipeline only ever creates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    pub unit_id: String,
    pub severity: Severity,
    pub message: String,
    pub triggered_at: DateTime<FixedOffset>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<FixedOffset>>,
}

// ============================================================================
// Energy series
// ============================================================================

/// One daily aggregate row.
///
/// Percentage fields are `None` when the source format cannot supply them;
/// consumers must treat that as "unknown", not as a measured zero. Capacity
/// totals are sums, so an empty day legitimately reads 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySeriesEntry {
    pub date: NaiveDate,
    #[serde(rename = "energyMWh", skip_serializing_if = "Option::is_none")]
    pub energy_mwh: Option<f64>,
    #[serde(rename = "energyKWh", skip_serializing_if = "Option::is_none")]
    pub energy_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_power_mw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_ratio_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irradiance_whm2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuf_pct: Option<f64>,
    pub total_dc_capacity_kw: f64,
    pub total_dc_capacity_mw: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_generation_per_kw: Option<f64>,
}

impl EnergySeriesEntry {
    /// An entry with nothing measured yet.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            energy_mwh: None,
            energy_kwh: None,
            peak_power_mw: None,
            availability_pct: None,
            performance_ratio_pct: None,
            irradiance_whm2: None,
            cuf_pct: None,
            total_dc_capacity_kw: 0.0,
            total_dc_capacity_mw: 0.0,
            avg_generation_per_kw: None,
        }
    }
}

/// One merged intraday sample on the common minute-aligned time axis.
/// `None` means "not reported", which is different from a measured zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradayPoint {
    /// Unix seconds, normalized to the nearest minute boundary.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_power_kw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solar_irradiation: Option<f64>,
    #[serde(rename = "dailyEnergyKWh", skip_serializing_if = "Option::is_none")]
    pub daily_energy_kwh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_ratio_pct: Option<f64>,
}

impl IntradayPoint {
    pub fn at(timestamp: i64) -> Self {
        Self {
            timestamp,
            active_power_kw: None,
            solar_irradiation: None,
            daily_energy_kwh: None,
            performance_ratio_pct: None,
        }
    }
}

// ============================================================================
// Weather
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_mps: f64,
    pub conditions: String,
    pub ghi_whm2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub day: String,
    pub conditions: String,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentWeather,
    pub forecast: Vec<ForecastDay>,
}

// ============================================================================
// History fields
// ============================================================================

/// Describes one column the history table should render, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryField {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl HistoryField {
    pub fn new(key: &str, label: &str, unit: Option<&str>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            unit: unit.map(str::to_string),
        }
    }
}

// ============================================================================
// Sharing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAccess {
    pub email: String,
    pub role: String,
    pub added_at: NaiveDate,
}

// ============================================================================
// Site
// ============================================================================

/// The top-level aggregate handed to the presentation layer.
///
/// Immutable once assembled; alarm acknowledgement and shared-access edits
/// happen in the external store on its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub site_key: String,
    pub name: String,
    pub location: String,
    pub capacity_mw: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<NaiveDate>,
    pub last_updated: DateTime<FixedOffset>,
    pub technology: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_availability_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance_ratio_pct: Option<f64>,
    pub energy_series: Vec<EnergySeriesEntry>,
    pub weather: WeatherSnapshot,
    pub units: Vec<Unit>,
    pub alarms: Vec<Alarm>,
    pub history_fields: Vec<HistoryField>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub intraday_by_date: BTreeMap<NaiveDate, Vec<IntradayPoint>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_intraday_dates: Vec<NaiveDate>,
    pub shared_access: Vec<SharedAccess>,
}

// ============================================================================
// Fleet summary
// ============================================================================

/// Fleet-wide rollup, computed as a reduction over the assembled sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetBenchmarks {
    pub total_capacity_mw: f64,
    pub average_performance_ratio: f64,
    pub last_updated: DateTime<FixedOffset>,
}
