//! Table discovery and CSV loading.
//!
//! Resolves the directory holding the pre-computed tables and reads
//! individual CSV files into [`RawTable`]s.

use crate::models::{DatasetError, DatasetResult, RawTable};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the preferred table directory under the base directory.
pub const TABLES_DIR_NAME: &str = "tables";

/// Configuration for locating and reading tables.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Directory the lookup starts from.
    pub base_dir: PathBuf,
    /// Explicit table directory, bypassing resolution.
    pub tables_dir: Option<PathBuf>,
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            tables_dir: None,
            delimiter: b',',
        }
    }
}

impl From<&crate::config::DataConfig> for LoadConfig {
    fn from(config: &crate::config::DataConfig) -> Self {
        Self {
            base_dir: config.base_dir.clone(),
            tables_dir: config.tables_dir.clone(),
            delimiter: config.delimiter_byte(),
        }
    }
}

/// Pick the directory CSV lookups are made against.
///
/// `<base>/tables` wins when it is a directory, otherwise `base` is used.
pub fn resolve_tables_dir(base: &Path) -> PathBuf {
    let preferred = base.join(TABLES_DIR_NAME);
    if preferred.is_dir() {
        preferred
    } else {
        base.to_path_buf()
    }
}

/// Reads tables from a resolved directory.
#[derive(Debug, Clone)]
pub struct TableLoader {
    root: PathBuf,
    delimiter: u8,
}

impl TableLoader {
    /// Create a loader, resolving the table directory from the config.
    pub fn new(config: &LoadConfig) -> Self {
        let root = match config.tables_dir {
            Some(ref dir) => dir.clone(),
            None => resolve_tables_dir(&config.base_dir),
        };
        Self {
            root,
            delimiter: config.delimiter,
        }
    }

    /// Directory lookups are made against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First candidate that exists as a file.
    pub fn locate(&self, candidates: &[&str]) -> DatasetResult<PathBuf> {
        candidates
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| DatasetError::MissingFile {
                tried: candidates.iter().map(|s| s.to_string()).collect(),
            })
    }

    /// Locate and parse the first existing candidate.
    pub fn load(&self, candidates: &[&str]) -> DatasetResult<RawTable> {
        let path = self.locate(candidates)?;
        read_csv(&path, self.delimiter)
    }
}

/// Parse a delimited file with a header row.
pub fn read_csv(path: &Path, delimiter: u8) -> DatasetResult<RawTable> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetError::Empty(path.to_path_buf()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(String::from).collect());
    }

    debug!(
        "Loaded {} ({} columns, {} rows)",
        path.display(),
        headers.len(),
        rows.len()
    );

    Ok(RawTable::new(headers, rows))
}
