//! Analysis modules.
//!
//! Turns the on-disk tables into the mapping the dashboard page charts.

pub mod aggregator;

pub use aggregator::*;
