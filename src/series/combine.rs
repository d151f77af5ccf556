//! Intraday series combiner
//!
//! The intraday exports arrive as one file per metric, sampled by clocks
//! that disagree by a few seconds. Timestamps snap to the nearest minute
//! boundary before merging so skewed samples land in the same bucket, and
//! every metric keeps an explicit presence flag: a bucket that one source
//! never reported is `None`, not zero.

use crate::domain::{IntradayPoint, Percentage};
use std::collections::BTreeMap;

/// A single-metric intraday series: `(unix seconds, value)` pairs.
pub type MetricSeries = Vec<(i64, f64)>;

/// Snap a unix timestamp to the nearest 60-second boundary.
pub fn snap_to_minute(timestamp: i64) -> i64 {
    (timestamp + 30).div_euclid(60) * 60
}

/// Merge up to four single-metric series into one timestamp-sorted series.
///
/// When no performance-ratio series is supplied it is derived per point from
/// power and irradiance against `pr_reference_capacity_kw`, defined only
/// where irradiance is positive and clamped to 0-100.
pub fn combine_intraday(
    active_power_kw: &MetricSeries,
    solar_irradiation: &MetricSeries,
    daily_energy_kwh: &MetricSeries,
    performance_ratio_pct: Option<&MetricSeries>,
    pr_reference_capacity_kw: f64,
) -> Vec<IntradayPoint> {
    let mut buckets: BTreeMap<i64, IntradayPoint> = BTreeMap::new();

    {
        let mut merge = |series: &MetricSeries, apply: fn(&mut IntradayPoint, f64)| {
            for (timestamp, value) in series {
                let minute = snap_to_minute(*timestamp);
                let point = buckets.entry(minute).or_insert_with(|| IntradayPoint::at(minute));
                apply(point, *value);
            }
        };

        merge(active_power_kw, |p, v| p.active_power_kw = Some(v));
        merge(solar_irradiation, |p, v| p.solar_irradiation = Some(v));
        merge(daily_energy_kwh, |p, v| p.daily_energy_kwh = Some(v));
        if let Some(series) = performance_ratio_pct {
            merge(series, |p, v| p.performance_ratio_pct = Some(v));
        }
    }

    if performance_ratio_pct.is_none() {
        for point in buckets.values_mut() {
            point.performance_ratio_pct = derive_performance_ratio(point, pr_reference_capacity_kw);
        }
    }

    buckets.into_values().collect()
}

/// `power_kW * 1000 * 100 / (capacity_kW * irradiance)`, only meaningful for
/// positive irradiance.
fn derive_performance_ratio(point: &IntradayPoint, capacity_kw: f64) -> Option<f64> {
    let power_kw = point.active_power_kw?;
    let irradiance = point.solar_irradiation?;
    if irradiance <= 0.0 || capacity_kw <= 0.0 {
        return None;
    }
    let ratio = power_kw * 1000.0 * 100.0 / (capacity_kw * irradiance);
    Some(Percentage::new(ratio).as_percent())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(29, 0)]
    #[case(30, 60)]
    #[case(59, 60)]
    #[case(61, 60)]
    #[case(90, 120)]
    #[case(-29, 0)]
    fn test_snap_to_minute(#[case] input: i64, #[case] expected: i64) {
        assert_eq!(snap_to_minute(input), expected);
    }

    #[test]
    fn test_skewed_clocks_share_a_bucket() {
        // power sampled 29 s after the irradiance clock
        let power = vec![(1_764_043_229, 800.0)];
        let irradiation = vec![(1_764_043_200, 1000.0)];
        let merged = combine_intraday(&power, &irradiation, &Vec::new(), None, 1200.0);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].timestamp, 1_764_043_200);
        assert_eq!(merged[0].active_power_kw, Some(800.0));
        assert_eq!(merged[0].solar_irradiation, Some(1000.0));
    }

    #[test]
    fn test_absence_is_not_zero() {
        let power = vec![(60, 0.0)];
        let energy = vec![(120, 410.0)];
        let merged = combine_intraday(&power, &Vec::new(), &energy, None, 1200.0);

        assert_eq!(merged.len(), 2);
        // measured zero stays a value
        assert_eq!(merged[0].active_power_kw, Some(0.0));
        assert_eq!(merged[0].daily_energy_kwh, None);
        // the energy-only bucket has no power reading at all
        assert_eq!(merged[1].active_power_kw, None);
        assert_eq!(merged[1].daily_energy_kwh, Some(410.0));
    }

    #[test]
    fn test_derived_performance_ratio() {
        let power = vec![(60, 960.0)];
        let irradiation = vec![(60, 1000.0)];
        let merged = combine_intraday(&power, &irradiation, &Vec::new(), None, 1200.0);
        // 960 * 1000 * 100 / (1200 * 1000) = 80
        assert_eq!(merged[0].performance_ratio_pct, Some(80.0));
    }

    #[test]
    fn test_zero_irradiance_yields_absent_ratio() {
        let power = vec![(60, 500.0)];
        let irradiation = vec![(60, 0.0)];
        let merged = combine_intraday(&power, &irradiation, &Vec::new(), None, 1200.0);
        assert_eq!(merged[0].performance_ratio_pct, None);
    }

    #[test]
    fn test_derived_ratio_is_clamped() {
        // tiny irradiance would push the raw ratio far beyond 100
        let power = vec![(60, 900.0)];
        let irradiation = vec![(60, 5.0)];
        let merged = combine_intraday(&power, &irradiation, &Vec::new(), None, 1200.0);
        assert_eq!(merged[0].performance_ratio_pct, Some(100.0));
    }

    #[test]
    fn test_supplied_ratio_series_wins_over_derivation() {
        let power = vec![(60, 960.0)];
        let irradiation = vec![(60, 1000.0)];
        let supplied = vec![(60, 77.5)];
        let merged =
            combine_intraday(&power, &irradiation, &Vec::new(), Some(&supplied), 1200.0);
        assert_eq!(merged[0].performance_ratio_pct, Some(77.5));
    }

    #[test]
    fn test_output_sorted_by_timestamp() {
        let power = vec![(300, 3.0), (60, 1.0), (180, 2.0)];
        let merged = combine_intraday(&power, &Vec::new(), &Vec::new(), None, 1200.0);
        let stamps: Vec<i64> = merged.iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![60, 180, 300]);
    }

    proptest! {
        #[test]
        fn snapped_timestamps_are_minute_aligned(ts in -10_000_000i64..10_000_000i64) {
            prop_assert_eq!(snap_to_minute(ts).rem_euclid(60), 0);
        }

        #[test]
        fn snapping_moves_at_most_30_seconds(ts in -10_000_000i64..10_000_000i64) {
            prop_assert!((snap_to_minute(ts) - ts).abs() <= 30);
        }
    }
}
