//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration is layered the same way for every CIVIX service:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Runtime tunables live in the database `settings` table, not here. The TOML file
//! only carries what is needed before the database can be opened.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the database file created inside the root folder
pub const DEFAULT_DATABASE_FILE: &str = "civix.db";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional. A missing file yields `TomlConfig::default()`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database (overridden by CLI/ENV)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Database file name relative to the root folder
    #[serde(default)]
    pub database_file: Option<String>,

    /// HTTP listen port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Geographic area the service is responsible for
    #[serde(default)]
    pub service_area: Option<ServiceAreaConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bounding box of the serviced area, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ServiceAreaConfig {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl ServiceAreaConfig {
    /// Approximate bounds of the City of Toronto
    pub const TORONTO: ServiceAreaConfig = ServiceAreaConfig {
        north: 43.855_457_9,
        south: 43.581_024_5,
        east: -79.115_730_5,
        west: -79.639_219,
    };

    /// Inclusive containment test on (longitude, latitude)
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lat >= self.south && lat <= self.north && lon >= self.west && lon <= self.east
    }

    /// Reject boxes whose edges are inverted or out of range
    pub fn validate(&self) -> Result<()> {
        let in_range = (-90.0..=90.0).contains(&self.south)
            && (-90.0..=90.0).contains(&self.north)
            && (-180.0..=180.0).contains(&self.west)
            && (-180.0..=180.0).contains(&self.east);
        if !in_range || self.south > self.north || self.west > self.east {
            return Err(Error::Config(format!("Invalid service area: {:?}", self)));
        }
        Ok(())
    }
}

impl Default for ServiceAreaConfig {
    fn default() -> Self {
        Self::TORONTO
    }
}

/// Load the TOML bootstrap file
///
/// A missing file is not an error: a warning is logged and defaults are used.
/// A present but malformed file is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    if let Some(area) = &config.service_area {
        area.validate()?;
    }

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Default location of the TOML file for a service
pub fn default_config_path(service_name: &str) -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("civix").join(format!("{}.toml", service_name)))
        .unwrap_or_else(|| PathBuf::from(format!("./{}.toml", service_name)))
}

/// Resolves the root folder following the CLI → ENV → TOML → default order
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    env_var_name: String,
}

impl RootFolderResolver {
    /// Create a resolver reading the given environment variable at tier 2
    pub fn new(env_var_name: &str) -> Self {
        Self {
            env_var_name: env_var_name.to_string(),
        }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &toml.root_folder {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("civix"))
        .unwrap_or_else(|| PathBuf::from("./civix_data"))
}

/// Database file path for a resolved root folder
pub fn database_path(root_folder: &Path, toml: &TomlConfig) -> PathBuf {
    let file = toml
        .database_file
        .as_deref()
        .unwrap_or(DEFAULT_DATABASE_FILE);
    root_folder.join(file)
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
        info!("Created root folder: {}", root_folder.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toronto_bounds_contain_city_hall() {
        assert!(ServiceAreaConfig::TORONTO.contains(-79.3832, 43.6532));
        assert!(!ServiceAreaConfig::TORONTO.contains(-73.5673, 45.5017));
    }

    #[test]
    fn test_inverted_service_area_rejected() {
        let area = ServiceAreaConfig {
            north: 10.0,
            south: 20.0,
            east: 5.0,
            west: 0.0,
        };
        assert!(matches!(area.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_database_path_defaults_file_name() {
        let toml = TomlConfig::default();
        let path = database_path(Path::new("/srv/civix"), &toml);
        assert_eq!(path, PathBuf::from("/srv/civix/civix.db"));
    }
}
