//! BreatheMap - air-quality analytics dashboard
//!
//! Serves one HTML page whose charts are fed from pre-computed CSV
//! tables. Each page request re-reads the tables; a table that is
//! missing or malformed simply leaves its chart empty.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, bind failure, etc.)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod server;
mod tables;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use server::ServerConfig;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("BreatheMap v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Fatal: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .breathemap.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change the listen address, table directory and assets.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    // stdout is reserved for --dry-run output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load config, then either dump the data once or start the server.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let server_config = ServerConfig::from_config(&config)?;

    if args.dry_run {
        return handle_dry_run(&server_config, args.output.as_deref());
    }

    server::serve(server_config).await
}

/// Handle --dry-run: aggregate once and print or write the JSON.
fn handle_dry_run(config: &ServerConfig, output: Option<&Path>) -> Result<()> {
    let dashboard = analysis::produce_with(&config.load);
    let json = report::generate_json_report(&dashboard)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "✅ Wrote {} datasets to {}",
                dashboard.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture_config() -> ServerConfig {
        let mut config = Config::default();
        config.data.base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        ServerConfig::from_config(&config).unwrap()
    }

    #[test]
    fn test_dry_run_output_is_json() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("dashboard.json");

        handle_dry_run(&fixture_config(), Some(&output)).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert!(parsed["summary"]["countries"].is_array());
        assert_eq!(parsed["aqi_labels"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_dry_run_output_path_error() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("missing").join("dashboard.json");

        assert!(handle_dry_run(&fixture_config(), Some(&output)).is_err());
    }
}
