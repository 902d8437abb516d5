//! Bootstrap configuration loading and root folder resolution
//!
//! Sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default
//!
//! A missing TOML file is not an error: defaults are used and a warning is
//! logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VOCAB_ROOT_FOLDER";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "VOCAB_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database file; defaults to `<root_folder>/vocab.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP trigger port
    #[serde(default)]
    pub port: Option<u16>,

    /// Bearer secret required by trigger endpoints
    #[serde(default)]
    pub trigger_secret: Option<String>,

    /// Seed lease expiry in seconds; unset means leases never expire
    #[serde(default)]
    pub lease_ttl_secs: Option<u64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Generation service connection
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
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

/// Generation service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model identifier sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key (lowest priority source)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

pub const DEFAULT_PORT: u16 = 5790;

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
    }

    /// Load the config file if one exists, otherwise defaults
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            _ => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Database path, falling back to `<root>/vocab.db`
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join("vocab.db"))
    }
}

/// Resolve root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// `~/.config/vocab/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vocab").join("config.toml"))
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("vocab"))
        .unwrap_or_else(|| PathBuf::from("./vocab_data"))
}
