//! Page and JSON output.

pub mod generator;

pub use generator::*;
