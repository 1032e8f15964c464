//! Configuration loading and resolution
//!
//! Priority order for every setting:
//! 1. Command-line argument (clap also folds in `COOKBOOK_*` env vars)
//! 2. TOML config file
//! 3. Compiled default
//!
//! A missing or malformed config file never aborts startup; the caller gets
//! a warning to log and the compiled defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "COOKBOOK_CONFIG";

/// Database file name under the root folder
pub const DATABASE_FILE_NAME: &str = "cookbook.db";

/// Settings as they appear in `config.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    /// `memory` or a SQLite file path / `sqlite://` URL
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub event_capacity: Option<usize>,
    pub cors_origins: Option<Vec<String>>,
}

/// Values supplied on the command line (or via env through clap)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub log_level: String,
    pub event_capacity: usize,
    pub cors_origins: Vec<String>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("cookbook"))
            .unwrap_or_else(|| PathBuf::from("./cookbook_data"));

        Self {
            root_folder,
            bind_address: "127.0.0.1".to_string(),
            port: 3001,
            log_level: "info".to_string(),
            event_capacity: 256,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Where the record store lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// Private in-memory database, lost on shutdown
    Memory,
    /// SQLite file, created on first run
    File(PathBuf),
}

impl DatabaseLocation {
    /// Interpret a `database_url` value
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value {
            "memory" | ":memory:" | "sqlite::memory:" => DatabaseLocation::Memory,
            _ => {
                let path = value
                    .strip_prefix("sqlite://")
                    .or_else(|| value.strip_prefix("sqlite:"))
                    .unwrap_or(value);
                DatabaseLocation::File(PathBuf::from(path))
            }
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub bind_address: String,
    pub port: u16,
    pub database: DatabaseLocation,
    pub log_level: String,
    pub event_capacity: usize,
    pub cors_origins: Vec<String>,
}

impl ServiceConfig {
    /// Merge overrides, file settings and compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: Option<TomlConfig>) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let file = file.unwrap_or_default();

        let root_folder = overrides
            .root_folder
            .or(file.root_folder)
            .unwrap_or(defaults.root_folder);

        let database = match overrides.database_url.or(file.database_url) {
            Some(url) => DatabaseLocation::parse(&url),
            None => DatabaseLocation::File(root_folder.join(DATABASE_FILE_NAME)),
        };

        Self {
            bind_address: overrides
                .bind_address
                .or(file.bind_address)
                .unwrap_or(defaults.bind_address),
            port: overrides.port.or(file.port).unwrap_or(defaults.port),
            database,
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            event_capacity: file
                .event_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.event_capacity),
            cors_origins: file.cors_origins.unwrap_or(defaults.cors_origins),
            root_folder,
        }
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Locate the config file
///
/// `COOKBOOK_CONFIG` wins; otherwise `~/.config/cookbook/config.toml`, then
/// `/etc/cookbook/config.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("cookbook").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cookbook/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Load the config file if one is present
///
/// Returns the parsed settings (if any) and a warning describing why the
/// file was ignored (if it was).
pub fn load_optional_config(explicit: Option<&Path>) -> (Option<TomlConfig>, Option<String>) {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_file) {
        Some(path) => path,
        None => return (None, None),
    };

    match load_toml_config(&path) {
        Ok(config) => (Some(config), None),
        Err(e) => (None, Some(format!("{}; using defaults", e))),
    }
}
