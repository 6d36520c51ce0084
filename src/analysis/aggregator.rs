//! Dataset aggregation.
//!
//! Runs every entry of the dataset catalog against the table directory
//! and merges the successful results into one JSON mapping. A dataset
//! that fails for any reason is left out; the others are unaffected.

use crate::models::DatasetResult;
use crate::tables::{DatasetSpec, Entries, LoadConfig, TableLoader, DATASETS};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Output of one aggregation run.
pub type Dashboard = Map<String, Value>;

/// Build the dashboard mapping from tables under `base_dir`.
///
/// `<base_dir>/tables` is preferred when it exists.
#[allow(dead_code)] // Entry point for callers without a config
pub fn produce(base_dir: &Path) -> Dashboard {
    let config = LoadConfig {
        base_dir: base_dir.to_path_buf(),
        ..LoadConfig::default()
    };
    produce_with(&config)
}

/// Build the dashboard mapping using an explicit loader configuration.
pub fn produce_with(config: &LoadConfig) -> Dashboard {
    let start_time = Instant::now();
    let loader = TableLoader::new(config);
    debug!("Aggregating tables from {}", loader.root().display());
    let mut dashboard = Dashboard::new();
    let mut skipped = Vec::new();

    for spec in DATASETS {
        match run_dataset(&loader, spec) {
            Ok(entries) => {
                for (key, value) in entries {
                    dashboard.insert(key.to_string(), value);
                }
            }
            Err(e) if e.is_missing_file() => {
                debug!(dataset = spec.key, "Skipping dataset: {}", e);
                skipped.push(spec.key);
            }
            Err(e) => {
                warn!(dataset = spec.key, reason = %e, "Skipping dataset");
                skipped.push(spec.key);
            }
        }
    }

    let loaded: Vec<&str> = dashboard.keys().map(String::as_str).collect();
    info!(
        "Loaded datasets: [{}] ({} skipped) in {:.1}ms",
        loaded.join(", "),
        skipped.len(),
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    dashboard
}

/// Load and reshape a single dataset.
pub fn run_dataset(loader: &TableLoader, spec: &DatasetSpec) -> DatasetResult<Entries> {
    let table = loader.load(spec.files)?;
    (spec.reshape)(&table)
}
