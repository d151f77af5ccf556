//! # solarfleet-ingest
//!
//! Telemetry ingestion and site assembly for a solar fleet dashboard.
//!
//! The pipeline turns heterogeneous vendor exports (two-row-header CSV
//! matrices, tagged-cell daily JSON, flat intraday JSON arrays) into one
//! serializable fleet snapshot: sites with units, alarms, daily energy
//! series, minute-aligned intraday lookups and a fleet-wide benchmark
//! rollup. Catalog entries without usable telemetry get a deterministic
//! synthetic site so consumers never special-case "no data".
//!
//! Everything runs synchronously in-process and is constructed through one
//! explicit call:
//!
//! ```rust
//! use solarfleet_ingest::{demo_catalog, FleetSnapshot, PipelineConfig};
//! use std::collections::BTreeMap;
//!
//! let config = PipelineConfig::default();
//! let snapshot = FleetSnapshot::build(&demo_catalog(), &BTreeMap::new(), &config);
//! assert_eq!(snapshot.sites.len(), 3);
//! ```
//!
//! Degradation is preferred over failure throughout: malformed sources parse
//! to empty structures with a warning, unknown values stay absent rather
//! than reading as zero, and out-of-range derived percentages clamp at the
//! point of computation.

pub mod assemble;
pub mod config;
pub mod domain;
pub mod fleet;
pub mod ingest;
pub mod series;
pub mod synthetic;
pub mod telemetry;

pub use config::PipelineConfig;
pub use fleet::{demo_catalog, demo_users, parse_catalog, FleetSnapshot, IngestError};
