//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.breathemap.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".breathemap.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Table location settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Static asset and template settings.
    #[serde(default)]
    pub assets: AssetsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Where the CSV tables live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory the lookup starts from; `<base_dir>/tables` is preferred.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Explicit table directory, skipping the `tables/` lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables_dir: Option<PathBuf>,

    /// Field delimiter (single ASCII character).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            tables_dir: None,
            delimiter: default_delimiter(),
        }
    }
}

impl DataConfig {
    /// Delimiter as a byte, falling back to a comma for non-ASCII input.
    pub fn delimiter_byte(&self) -> u8 {
        if self.delimiter.is_ascii() {
            self.delimiter as u8
        } else {
            b','
        }
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_delimiter() -> char {
    ','
}

/// Static assets and page template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory served verbatim under `url_prefix`.
    #[serde(default = "default_assets_dir")]
    pub dir: PathBuf,

    /// URL prefix for static assets; substituted for `{{ static_url }}` in the template.
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,

    /// HTML template for the index page; the bundled one is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            url_prefix: default_url_prefix(),
            template: None,
        }
    }
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_url_prefix() -> String {
    "/static".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref base_dir) = args.base_dir {
            self.data.base_dir = base_dir.clone();
        }
        if let Some(ref tables_dir) = args.tables_dir {
            self.data.tables_dir = Some(tables_dir.clone());
        }

        if let Some(ref assets_dir) = args.assets_dir {
            self.assets.dir = assets_dir.clone();
        }
        if let Some(ref template) = args.template {
            self.assets.template = Some(template.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
