//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Defaults live in the config layer so that
//! only flags the user actually passes override `.breathemap.toml`.

use clap::Parser;
use std::path::PathBuf;

/// BreatheMap - air-quality analytics dashboard
///
/// Serves a single dashboard page whose charts are fed from
/// pre-computed CSV tables found in `./tables` (or the working directory).
///
/// Examples:
///   breathemap
///   breathemap --port 8080 --host 0.0.0.0
///   breathemap --tables-dir ./output/tables --template ./index.html
///   breathemap --dry-run --output dashboard.json
///   breathemap --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .breathemap.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long, value_name = "HOST", env = "BREATHEMAP_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, value_name = "PORT", env = "BREATHEMAP_PORT")]
    pub port: Option<u16>,

    /// Directory the table lookup starts from
    ///
    /// A `tables` subdirectory is used when present.
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Read tables from exactly this directory
    #[arg(long, value_name = "DIR")]
    pub tables_dir: Option<PathBuf>,

    /// Directory of static assets served under /static
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    /// HTML template for the dashboard page
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Aggregate the tables once, print the JSON and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Write the --dry-run JSON to a file instead of stdout
    #[arg(short, long, value_name = "FILE", requires = "dry_run")]
    pub output: Option<PathBuf>,

    /// Generate a default .breathemap.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.port == Some(0) {
            return Err("Port must be between 1 and 65535".to_string());
        }

        if let Some(ref tables_dir) = self.tables_dir {
            if !tables_dir.is_dir() {
                return Err(format!(
                    "Tables directory does not exist: {}",
                    tables_dir.display()
                ));
            }
        }

        if let Some(ref template) = self.template {
            if !template.is_file() {
                return Err(format!("Template not found: {}", template.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
