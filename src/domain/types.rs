use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Cell Values
// ============================================================================

/// A single cell sampled from a telemetry source.
///
/// Date and time columns carry text; metric columns carry a number or an
/// explicit `Missing` marker. "Missing" and "measured zero" are different
/// states and must never be collapsed into each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Numeric view of the cell, `None` for text or missing cells.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) | CellValue::Missing => None,
        }
    }

    /// Text view of the cell, `None` for numeric or missing cells.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Number(_) | CellValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Missing => write!(f, "-"),
        }
    }
}

// ============================================================================
// Percentage
// ============================================================================

/// Percentage clamped to 0-100%
///
/// Derived ratios (performance ratio, availability, CUF) can overshoot on
/// noisy inputs; clamping happens here, at the point of construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Percentage(pub f64);

impl Percentage {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    pub fn from_ratio(ratio: f64) -> Self {
        Self((ratio * 100.0).clamp(0.0, 100.0))
    }

    pub fn as_percent(&self) -> f64 {
        self.0
    }

    pub fn as_ratio(&self) -> f64 {
        self.0 / 100.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

// ============================================================================
// Time helpers
// ============================================================================

/// Fixed offset from whole hours, falling back to UTC for out-of-range
/// configuration values.
pub fn fixed_offset_hours(hours: i32) -> chrono::FixedOffset {
    use chrono::Offset;
    chrono::FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| chrono::Utc.fix())
}

// ============================================================================
// Rounding helpers
// ============================================================================

/// Round to two decimals, the precision the energy tables are published at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_views() {
        assert_eq!(CellValue::Number(4.5).as_number(), Some(4.5));
        assert_eq!(CellValue::Text("06:00".into()).as_number(), None);
        assert_eq!(CellValue::Missing.as_number(), None);

        assert_eq!(CellValue::Text("06:00".into()).as_text(), Some("06:00"));
        assert!(CellValue::Missing.is_missing());
        assert!(!CellValue::Number(0.0).is_missing());
    }

    #[test]
    fn test_percentage_clamping() {
        assert_eq!(Percentage::new(75.0).as_percent(), 75.0);
        assert_eq!(Percentage::new(150.0).as_percent(), 100.0);
        assert_eq!(Percentage::new(-10.0).as_percent(), 0.0);

        assert_eq!(Percentage::from_ratio(0.5).as_percent(), 50.0);
        assert_eq!(Percentage::from_ratio(1.8).as_percent(), 100.0);
    }

    #[test]
    fn test_percentage_display() {
        assert_eq!(format!("{}", Percentage::new(82.44)), "82.4%");
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round2(0.2996), 0.3);
        assert_eq!(round2(123.456), 123.46);
        assert_eq!(round1(79.95), 80.0);
    }
}
