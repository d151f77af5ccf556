//! Synthetic site generation
//!
//! Catalog entries without telemetry still need a structurally complete,
//! numerically plausible site so nothing downstream has to special-case
//! "no data". Every draw routes through one seeded [`RandomSource`] per
//! site: the same catalog entry always yields the same site.

use crate::assemble::heuristics::{base_history_fields, derive_location};
use crate::config::SyntheticConfig;
use crate::domain::{
    fixed_offset_hours, round1, round2, Alarm, CatalogEntry, CurrentWeather, EnergySeriesEntry,
    ForecastDay, Percentage, Severity, Site, Unit, UnitStatus, UnitType, WeatherSnapshot,
};
use crate::ingest::normalize::slugify;
use crate::series::metrics::cuf_pct;
use crate::synthetic::prng::{RandomSource, SeedStrategy, XorShiftStrategy};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone};

const INVERTER_VENDORS: [&str; 4] = ["Sungrow", "SMA", "Huawei", "GE"];
const METER_VENDORS: [&str; 2] = ["Secure", "Schneider"];
const STATION_VENDORS: [&str; 2] = ["Campbell", "Vaisala"];

const MODULE_TECH: [&str; 3] = ["Mono PERC", "Bi-facial Modules", "TOPCon"];
const INVERTER_TECH: [&str; 2] = ["Central Inverters", "String Inverters"];
const MOUNTING_TECH: [&str; 2] = ["Single Axis Trackers", "Fixed Tilt"];

const WEATHER_CONDITIONS: [&str; 5] =
    ["Clear", "Sunny", "Partly cloudy", "Overcast", "Scattered storms"];

const ALARM_MESSAGES: [&str; 6] = [
    "DC string current imbalance detected",
    "Inverter temperature above optimal range",
    "Inverter offline longer than 30 minutes",
    "Preventive maintenance active",
    "Grid voltage fluctuation detected",
    "Communication lost with weather station",
];

const ACKNOWLEDGERS: [&str; 3] = ["Devon Admin", "Anita Owner", "Ops Team"];

/// Generates a full plausible [`Site`] from nothing but a catalog entry.
#[derive(Debug, Clone)]
pub struct SyntheticSiteGenerator<'a, S = XorShiftStrategy> {
    config: &'a SyntheticConfig,
    strategy: S,
}

impl<'a> SyntheticSiteGenerator<'a> {
    pub fn new(config: &'a SyntheticConfig) -> Self {
        Self {
            config,
            strategy: XorShiftStrategy,
        }
    }
}

impl<'a, S: SeedStrategy> SyntheticSiteGenerator<'a, S> {
    pub fn with_strategy(config: &'a SyntheticConfig, strategy: S) -> Self {
        Self { config, strategy }
    }

    pub fn generate(&self, entry: &CatalogEntry) -> Site {
        let seed_input = if entry.site_key.is_empty() {
            &entry.name
        } else {
            &entry.site_key
        };
        let mut rng = self.strategy.seed(seed_input);
        let offset = fixed_offset_hours(self.config.utc_offset_hours);
        let anchor = self.config.anchor_date;
        let capacity_mw = entry.site_capacity.max(0.0);

        let energy_series = self.energy_series(&mut rng, capacity_mw);
        let avg_availability = mean(energy_series.iter().filter_map(|e| e.availability_pct));
        let avg_performance = mean(energy_series.iter().filter_map(|e| e.performance_ratio_pct));

        let units = self.units(&mut rng, capacity_mw);
        let alarms = self.alarms(&mut rng, &units, anchor, offset);
        let weather = weather_for(&mut rng, anchor, self.config.forecast_days);

        let installed_at = anchor - Duration::days(rng.int_in_range(400, 2000));
        let last_updated = stamp(
            anchor,
            (9 + rng.int_in_range(0, 2)) as u32,
            rng.int_in_range(0, 59) as u32,
            offset,
        );

        Site {
            id: format!("site-{}", slugify(&entry.name)),
            site_key: entry.site_key.clone(),
            name: entry.name.clone(),
            location: derive_location(entry),
            capacity_mw,
            status: entry.status.clone(),
            installed_at: Some(installed_at),
            last_updated,
            technology: vec![
                (*rng.pick(&MODULE_TECH)).to_string(),
                (*rng.pick(&INVERTER_TECH)).to_string(),
                (*rng.pick(&MOUNTING_TECH)).to_string(),
            ],
            avg_availability_pct: avg_availability.map(round1),
            performance_ratio_pct: avg_performance.map(round1),
            energy_series,
            weather,
            units,
            alarms,
            history_fields: base_history_fields(),
            intraday_by_date: Default::default(),
            available_intraday_dates: Vec::new(),
            shared_access: Vec::new(),
        }
    }

    fn energy_series(&self, rng: &mut S::Source, capacity_mw: f64) -> Vec<EnergySeriesEntry> {
        let days = self.config.history_days.max(1) as i64;
        let mut series = Vec::with_capacity(days as usize);
        for back in (0..days).rev() {
            let date = self.config.anchor_date - Duration::days(back);
            let availability = rng.in_range(0.70, 0.90);
            let multiplier = rng.in_range(0.85, 1.05);
            let energy_mwh = round2(capacity_mw * 24.0 * availability * multiplier);

            let mut entry = EnergySeriesEntry::empty(date);
            entry.energy_mwh = Some(energy_mwh);
            entry.availability_pct = Some(Percentage::new(round1(availability * 100.0)).as_percent());
            entry.performance_ratio_pct =
                Some(Percentage::new(round1(rng.in_range(68.0, 92.0))).as_percent());
            entry.irradiance_whm2 = Some(rng.in_range(3800.0, 6600.0).round());
            entry.peak_power_mw = Some(round2(capacity_mw * rng.in_range(0.82, 0.98)));
            entry.cuf_pct = cuf_pct(energy_mwh, capacity_mw, 1.0);
            series.push(entry);
        }
        series
    }

    fn units(&self, rng: &mut S::Source, capacity_mw: f64) -> Vec<Unit> {
        let inverter_count = ((capacity_mw / 0.6).round() as i64).clamp(1, 8);
        let rated_mw = round2(capacity_mw / inverter_count as f64);
        let vendor = (*rng.pick(&INVERTER_VENDORS)).to_string();

        let mut units = Vec::with_capacity(inverter_count as usize + 2);
        for i in 0..inverter_count {
            let status = roll_status(rng);
            let producing = matches!(status, UnitStatus::Online | UnitStatus::Warning);
            units.push(Unit {
                id: format!("inv-{}", 1001 + i),
                unit_type: UnitType::CentralInverter,
                vendor: vendor.clone(),
                rated_mw,
                status,
                last_output_mwh: if producing {
                    round1(rated_mw * rng.in_range(4.0, 7.5))
                } else {
                    0.0
                },
                temperature_c: if producing {
                    rng.in_range(35.0, 55.0).round()
                } else {
                    0.0
                },
                issues: match status {
                    UnitStatus::Online => 0,
                    UnitStatus::Warning | UnitStatus::Maintenance => 1,
                    UnitStatus::Offline => rng.int_in_range(1, 3) as u32,
                },
            });
        }

        units.push(Unit {
            id: "met-2001".to_string(),
            unit_type: UnitType::EnergyMeter,
            vendor: (*rng.pick(&METER_VENDORS)).to_string(),
            rated_mw: 0.0,
            status: UnitStatus::Online,
            last_output_mwh: 0.0,
            temperature_c: rng.in_range(25.0, 35.0).round(),
            issues: 0,
        });
        units.push(Unit {
            id: "met-2101".to_string(),
            unit_type: UnitType::WeatherStation,
            vendor: (*rng.pick(&STATION_VENDORS)).to_string(),
            rated_mw: 0.0,
            status: UnitStatus::Online,
            last_output_mwh: 0.0,
            temperature_c: rng.in_range(18.0, 34.0).round(),
            issues: 0,
        });
        units
    }

    fn alarms(
        &self,
        rng: &mut S::Source,
        units: &[Unit],
        anchor: NaiveDate,
        offset: FixedOffset,
    ) -> Vec<Alarm> {
        let count = rng.int_in_range(1, 3);
        let base = stamp(anchor, 10, 30, offset);

        let mut alarms = Vec::with_capacity(count as usize);
        for i in 0..count {
            let unit_id = if units.is_empty() {
                "site".to_string()
            } else {
                rng.pick(units).id.clone()
            };
            let severity = roll_severity(rng);
            let message = (*rng.pick(&ALARM_MESSAGES)).to_string();
            let triggered_at = base - Duration::hours(rng.int_in_range(1, 72));
            let acknowledged_by = if rng.chance(0.5) {
                Some((*rng.pick(&ACKNOWLEDGERS)).to_string())
            } else {
                None
            };
            let resolved_at = if acknowledged_by.is_some() && rng.chance(0.5) {
                Some(triggered_at + Duration::hours(rng.int_in_range(1, 8)))
            } else {
                None
            };
            alarms.push(Alarm {
                id: format!("alm-{:04}", 7700 + i),
                unit_id,
                severity,
                message,
                triggered_at,
                acknowledged_by,
                resolved_at,
            });
        }
        alarms
    }
}

/// Weighted status roll; Online dominates.
fn roll_status(rng: &mut impl RandomSource) -> UnitStatus {
    let roll = rng.next_f64();
    if roll < 0.70 {
        UnitStatus::Online
    } else if roll < 0.82 {
        UnitStatus::Warning
    } else if roll < 0.92 {
        UnitStatus::Maintenance
    } else {
        UnitStatus::Offline
    }
}

fn roll_severity(rng: &mut impl RandomSource) -> Severity {
    let roll = rng.next_f64();
    if roll < 0.35 {
        Severity::Low
    } else if roll < 0.65 {
        Severity::Medium
    } else if roll < 0.90 {
        Severity::High
    } else {
        Severity::Critical
    }
}

/// Current conditions plus a short forecast, drawn from the caller's stream.
/// Also used by the real-data strategies, which have no weather source of
/// their own.
pub fn weather_for(
    rng: &mut impl RandomSource,
    anchor: NaiveDate,
    forecast_days: u32,
) -> WeatherSnapshot {
    let temperature_c = rng.in_range(18.0, 38.0).round();
    let current = CurrentWeather {
        temperature_c,
        humidity_pct: rng.in_range(20.0, 70.0).round(),
        wind_mps: round1(rng.in_range(2.0, 8.0)),
        conditions: (*rng.pick(&WEATHER_CONDITIONS)).to_string(),
        ghi_whm2: rng.in_range(3800.0, 6600.0).round(),
    };

    let forecast = (1..=forecast_days as i64)
        .map(|day| ForecastDay {
            day: (anchor + Duration::days(day)).format("%a").to_string(),
            conditions: (*rng.pick(&WEATHER_CONDITIONS)).to_string(),
            temperature_c: temperature_c + rng.in_range(-3.0, 3.0).round(),
        })
        .collect();

    WeatherSnapshot { current, forecast }
}

pub(crate) fn stamp(
    date: NaiveDate,
    hour: u32,
    minute: u32,
    offset: FixedOffset,
) -> DateTime<FixedOffset> {
    let naive = date
        .and_hms_opt(hour, minute, 0)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN));
    match offset.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt,
        _ => DateTime::from_naive_utc_and_offset(naive, offset),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        None
    } else {
        Some(collected.iter().sum::<f64>() / collected.len() as f64)
    }
}
