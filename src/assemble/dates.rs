//! Intraday date resolution
//!
//! The presentation layer asks for arbitrary dates; real data only exists
//! for some. Resolution picks the closest available date at or before the
//! target, clamped to a hard window, and falls back to the earliest
//! available date when the target predates everything (never the latest, so
//! a too-early request cannot silently show future data).

use crate::config::DateWindowConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Order of clamping vs. resolving. The two site schemas historically
/// disagreed here; both behaviors are kept selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateResolution {
    /// Clamp the target into the window first, then resolve against the
    /// available set.
    ClampThenResolve,
    /// Resolve against the available set first, then clamp the result.
    ResolveThenClamp,
}

/// Hard min/max bounds for date requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateWindow {
    pub fn from_config(config: &DateWindowConfig) -> Self {
        Self {
            min: config.min_date,
            max: config.max_date,
        }
    }

    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.min, self.max)
    }
}

/// Sorted, deduplicated set of dates that actually carry intraday data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableDates {
    dates: Vec<NaiveDate>,
}

impl AvailableDates {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn as_slice(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn earliest(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn latest(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Resolve a requested date to one that has data. `None` only when the
    /// set itself is empty.
    pub fn resolve(
        &self,
        target: NaiveDate,
        window: DateWindow,
        mode: DateResolution,
    ) -> Option<NaiveDate> {
        let earliest = self.earliest()?;
        match mode {
            DateResolution::ClampThenResolve => {
                let desired = window.clamp(target);
                Some(self.at_or_before(desired).unwrap_or(earliest))
            }
            DateResolution::ResolveThenClamp => {
                let resolved = self.at_or_before(target).unwrap_or(earliest);
                Some(window.clamp(resolved))
            }
        }
    }

    fn at_or_before(&self, target: NaiveDate) -> Option<NaiveDate> {
        self.dates.iter().rev().find(|d| **d <= target).copied()
    }
}
