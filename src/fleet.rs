//! Fleet snapshot construction
//!
//! The single explicit entry point the host application calls at startup.
//! Construction has no import-time side effects and no wall-clock inputs;
//! the same catalog, sources and configuration always produce the same
//! snapshot, which the presentation layer copies into its own store and
//! keeps as a reset baseline.

use crate::assemble::{assemble_site, RealDataSource};
use crate::config::PipelineConfig;
use crate::domain::{round1, round2, CatalogEntry, FleetBenchmarks, Site};
use crate::synthetic::site_gen::stamp;
use crate::{assemble, domain::fixed_offset_hours};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Catalog problems a caller can meaningfully branch on. Telemetry parse
/// failures never surface here; those degrade inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("catalog is not a valid entry array: {0}")]
    CatalogJson(#[from] serde_json::Error),

    #[error("catalog entry {index} has an empty site key")]
    MissingSiteKey { index: usize },

    #[error("duplicate site key in catalog: {0}")]
    DuplicateSiteKey(String),
}

/// Parse and validate a catalog JSON array. Site keys must be present and
/// unique; everything downstream matches sources by key.
pub fn parse_catalog(text: &str) -> Result<Vec<CatalogEntry>, IngestError> {
    let catalog: Vec<CatalogEntry> = serde_json::from_str(text)?;
    let mut seen = std::collections::BTreeSet::new();
    for (index, entry) in catalog.iter().enumerate() {
        if entry.site_key.trim().is_empty() {
            return Err(IngestError::MissingSiteKey { index });
        }
        if !seen.insert(entry.site_key.clone()) {
            return Err(IngestError::DuplicateSiteKey(entry.site_key.clone()));
        }
    }
    Ok(catalog)
}

/// A dashboard persona. Fixture data only; authentication itself is the host
/// application's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub accessible_site_ids: Vec<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

/// Everything the pipeline hands over: sites in catalog order plus the
/// fleet-wide rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub sites: Vec<Site>,
    pub benchmarks: FleetBenchmarks,
}

impl FleetSnapshot {
    /// Assemble every catalog entry, matching raw sources by site key.
    /// Cannot fail for data reasons: entries without usable telemetry get
    /// synthetic sites.
    pub fn build(
        catalog: &[CatalogEntry],
        sources: &BTreeMap<String, RealDataSource>,
        config: &PipelineConfig,
    ) -> Self {
        let sites: Vec<Site> = catalog
            .iter()
            .map(|entry| assemble_site(entry, sources.get(&entry.site_key), config))
            .collect();

        let real = sites
            .iter()
            .filter(|s| !s.intraday_by_date.is_empty() || sources.contains_key(&s.site_key))
            .count();
        info!(
            sites = sites.len(),
            with_real_data = real,
            "fleet snapshot assembled"
        );

        let benchmarks = benchmarks_for(&sites, config);
        Self { sites, benchmarks }
    }
}

fn benchmarks_for(sites: &[Site], config: &PipelineConfig) -> FleetBenchmarks {
    let total_capacity_mw = round2(sites.iter().map(|s| s.capacity_mw).sum());
    let average_performance_ratio =
        assemble::mean(sites.iter().filter_map(|s| s.performance_ratio_pct))
            .map(round1)
            .unwrap_or(0.0);
    let last_updated = sites
        .iter()
        .map(|s| s.last_updated)
        .max()
        .unwrap_or_else(|| {
            stamp(
                config.synthetic.anchor_date,
                12,
                0,
                fixed_offset_hours(config.synthetic.utc_offset_hours),
            )
        });

    FleetBenchmarks {
        total_capacity_mw,
        average_performance_ratio,
        last_updated,
    }
}

/// The built-in three-site demo catalog.
pub fn demo_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            site_key: "desert-bloom".to_string(),
            name: "Desert Bloom Solar".to_string(),
            site_capacity: 42.0,
            status: "Operational".to_string(),
            coordinates: None,
            description: Some("Phoenix, AZ".to_string()),
        },
        CatalogEntry {
            site_key: "coastal-breeze".to_string(),
            name: "Coastal Breeze Solar".to_string(),
            site_capacity: 28.0,
            status: "Operational".to_string(),
            coordinates: None,
            description: Some("San Luis Obispo, CA".to_string()),
        },
        CatalogEntry {
            site_key: "rolling-hills".to_string(),
            name: "Rolling Hills Solar".to_string(),
            site_capacity: 36.0,
            status: "Commissioning".to_string(),
            coordinates: None,
            description: Some("Austin, TX".to_string()),
        },
    ]
}

/// Demo personas with tiered site access, matching the demo catalog's
/// generated site ids.
pub fn demo_users() -> Vec<User> {
    let all = vec![
        "site-desert-bloom-solar".to_string(),
        "site-coastal-breeze-solar".to_string(),
        "site-rolling-hills-solar".to_string(),
    ];
    vec![
        User {
            id: "user-owner".to_string(),
            name: "Anita Owner".to_string(),
            email: "anita.owner@solarfleet.example".to_string(),
            role: Role::Owner,
            accessible_site_ids: all.clone(),
        },
        User {
            id: "user-admin".to_string(),
            name: "Devon Admin".to_string(),
            email: "devon.admin@solarfleet.example".to_string(),
            role: Role::Admin,
            accessible_site_ids: all[..2].to_vec(),
        },
        User {
            id: "user-member".to_string(),
            name: "Maya Member".to_string(),
            email: "maya.member@solarfleet.example".to_string(),
            role: Role::Member,
            accessible_site_ids: all[..1].to_vec(),
        },
    ]
}
