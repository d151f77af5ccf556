use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde_json::json;
use solarfleet_ingest::assemble::{DayIntraday, RealDataSource};
use solarfleet_ingest::domain::CatalogEntry;
use solarfleet_ingest::ingest::{daily_buckets, intraday, matrix_csv, normalize};
use solarfleet_ingest::{demo_catalog, demo_users, fleet, telemetry, FleetSnapshot, PipelineConfig};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fleet-seed")]
#[command(about = "Assemble the fleet seed from a site catalog and raw telemetry exports", long_about = None)]
struct Cli {
    /// Path to the site catalog JSON (array of catalog entries). Defaults to
    /// the built-in demo catalog.
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Directory holding one subdirectory of raw exports per site key.
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Where to write the assembled seed JSON.
    #[arg(short, long, default_value = "seed.json")]
    out: PathBuf,
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let config = PipelineConfig::load()?;

    let catalog = match &cli.catalog {
        Some(path) => load_catalog(path)?,
        None => demo_catalog(),
    };

    let sources = match &cli.data_dir {
        Some(dir) => scan_data_dir(dir, &catalog),
        None => BTreeMap::new(),
    };

    let snapshot = FleetSnapshot::build(&catalog, &sources, &config);

    let seed = json!({
        "users": demo_users(),
        "sites": &snapshot.sites,
        "fleetBenchmarks": &snapshot.benchmarks,
    });
    let rendered = serde_json::to_string_pretty(&seed)?;
    fs::write(&cli.out, rendered)
        .with_context(|| format!("failed to write seed to {}", cli.out.display()))?;

    info!(out = %cli.out.display(), sites = snapshot.sites.len(), "seed written");
    Ok(())
}

fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    fleet::parse_catalog(&text)
        .with_context(|| format!("catalog {} failed validation", path.display()))
}

/// Match each catalog entry to `<data_dir>/<site_key>/`. Sites without a
/// directory simply get no source; everything inside one is best-effort.
fn scan_data_dir(data_dir: &Path, catalog: &[CatalogEntry]) -> BTreeMap<String, RealDataSource> {
    let mut sources = BTreeMap::new();
    for entry in catalog {
        let site_dir = data_dir.join(&entry.site_key);
        if !site_dir.is_dir() {
            continue;
        }
        match scan_site_dir(&site_dir) {
            Some(source) if source.is_usable() => {
                sources.insert(entry.site_key.clone(), source);
            }
            _ => {
                warn!(site_key = %entry.site_key, "no usable telemetry in site directory");
            }
        }
    }
    sources
}

/// Pick up the site's exports: top-level CSV becomes the device matrix,
/// top-level JSON the daily buckets, and date-named subdirectories the
/// per-day intraday series. Folders whose name decodes to no date are
/// skipped rather than guessed at.
fn scan_site_dir(site_dir: &Path) -> Option<RealDataSource> {
    let mut matrix = matrix_csv::MatrixTable::default();
    let mut buckets = Vec::new();
    let mut samples_by_date: BTreeMap<NaiveDate, Vec<intraday::RawSample>> = BTreeMap::new();

    for child in read_dir_sorted(site_dir) {
        let name = child.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if child.is_dir() {
            let Some(date) = normalize::iso_date_from_folder_name(name) else {
                warn!(folder = %name, "folder name decodes to no date, skipping");
                continue;
            };
            let bucket = samples_by_date.entry(date).or_default();
            for file in read_dir_sorted(&child) {
                if file.extension().and_then(|e| e.to_str()) == Some("json") {
                    if let Some(text) = read_text(&file) {
                        bucket.extend(intraday::parse(&text));
                    }
                }
            }
        } else {
            match child.extension().and_then(|e| e.to_str()) {
                Some("csv") if matrix.is_empty() => {
                    if let Some(text) = read_text(&child) {
                        matrix = matrix_csv::parse(&text);
                    }
                }
                Some("json") => {
                    if let Some(text) = read_text(&child) {
                        buckets.extend(daily_buckets::parse(&text));
                    }
                }
                _ => {}
            }
        }
    }

    let intraday_days: BTreeMap<NaiveDate, DayIntraday> = samples_by_date
        .into_iter()
        .map(|(date, samples)| (date, DayIntraday::from_samples(&samples)))
        .filter(|(_, day)| !day.is_empty())
        .collect();

    if !matrix.is_empty() {
        Some(RealDataSource::CsvTelemetry {
            matrix,
            intraday: intraday_days,
        })
    } else if !buckets.is_empty() {
        buckets.sort_by_key(|b| b.date);
        Some(RealDataSource::TaggedJsonBuckets {
            buckets,
            intraday: intraday_days,
        })
    } else {
        None
    }
}

fn read_dir_sorted(dir: &Path) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to read directory");
            Vec::new()
        }
    };
    children.sort();
    children
}

fn read_text(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) => {
            warn!(file = %path.display(), error = %err, "failed to read file, skipping");
            None
        }
    }
}
