//! Optional TOML configuration
//!
//! Looked up in this order, first hit wins:
//! 1. the `--config` path
//! 2. `catalog-cli.toml` in the working directory
//! 3. `<config dir>/catalog-cli/config.toml`
//!
//! Every setting is optional; command line flags override the file and the
//! built-in defaults in [`defaults`] apply last.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::ColumnSpec;

pub const LOCAL_CONFIG_FILE: &str = "catalog-cli.toml";
const APP_DIR: &str = "catalog-cli";
const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Built-in defaults, matching the layout of the catalog workspace
pub mod defaults {
    pub const WORKBOOK: &str = "CONTINENTAL WHOLESALE 2.xlsx";
    pub const SHEET: &str = "Package";
    pub const OUTPUT_DIR: &str = "images";
    pub const CREDENTIALS: &str = "serviceAccountKey.json";
    pub const CSV: &str = "package_list.csv";
    pub const COLLECTION: &str = "packages";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub extract: ExtractConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub workbook: Option<PathBuf>,
    pub sheet: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub anchor_column: Option<ColumnSpec>,
    pub code_column: Option<ColumnSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    pub credentials: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub collection: Option<String>,
    pub database: Option<String>,
}

impl Config {
    /// Load the config file, or defaults if none exists.
    ///
    /// An explicitly given path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file does not exist: {}", path.display());
            }
            return Self::from_file(path);
        }

        for candidate in Self::default_locations() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join(APP_DIR).join(GLOBAL_CONFIG_FILE));
        }
        locations
    }
}
