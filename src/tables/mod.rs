//! Pre-computed CSV tables: discovery, loading and reshaping.

pub mod datasets;
pub mod loader;
pub mod reshape;

pub use datasets::{DatasetSpec, Entries, DATASETS};
pub use loader::{LoadConfig, TableLoader};
