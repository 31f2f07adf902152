//! Configuration loading and layered resolution
//!
//! Config file location priority:
//! 1. Command-line argument (highest priority)
//! 2. `NAMER_CONFIG` environment variable
//! 3. `~/.config/namer/namer.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not fatal: a warning is logged and compiled
//! defaults are used. A file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "NAMER_CONFIG";

/// Environment variable overriding `failed_dir`
pub const FAILED_DIR_ENV_VAR: &str = "NAMER_FAILED_DIR";

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_NAME_MATCH_THRESHOLD: f64 = 89.9;
const DEFAULT_PHASH_DISTANCE_THRESHOLD: u32 = 2;

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Namer configuration as read from TOML
///
/// Every field has a compiled default, so a partial file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory holding files whose automatic lookup failed
    pub failed_dir: PathBuf,

    /// ffprobe executable (name on PATH or absolute path)
    pub ffprobe_path: String,

    /// Upper bound on a single probe invocation
    pub probe_timeout_secs: u64,

    /// Media file extensions handled by namer, without leading dot
    pub target_extensions: Vec<String>,

    /// SQLite file backing the duration cache (cache disabled when unset)
    pub database_path: Option<PathBuf>,

    /// Custom filename regex; must define a `name` group
    pub name_parser: Option<String>,

    /// Minimum name similarity percentage for a confident match
    pub name_match_threshold: f64,

    /// Maximum perceptual hash distance for a confident match
    pub phash_distance_threshold: u32,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            failed_dir: PathBuf::from("./failed"),
            ffprobe_path: "ffprobe".to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            target_extensions: ["mp4", "mkv", "avi", "mov", "flv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            database_path: None,
            name_parser: None,
            name_match_threshold: DEFAULT_NAME_MATCH_THRESHOLD,
            phash_distance_threshold: DEFAULT_PHASH_DISTANCE_THRESHOLD,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(FAILED_DIR_ENV_VAR) {
            if !dir.trim().is_empty() {
                debug!(failed_dir = %dir, "failed_dir overridden from environment");
                self.failed_dir = PathBuf::from(dir);
            }
        }
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_secs == 0 {
            return Err(Error::Config("probe_timeout_secs must be greater than 0".to_string()));
        }
        if !(0.0..=100.0).contains(&self.name_match_threshold) {
            return Err(Error::Config(format!(
                "name_match_threshold must be within 0-100, got {}",
                self.name_match_threshold
            )));
        }
        if self.ffprobe_path.trim().is_empty() {
            return Err(Error::Config("ffprobe_path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Probe timeout as a `Duration`
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Target extensions without leading dot, lowercased, in configured order
    pub fn extensions(&self) -> Vec<String> {
        self.target_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

/// Per-user config file location (`~/.config/namer/namer.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("namer").join("namer.toml"))
}

/// Pick the config file to load, by priority
///
/// Returns `None` when no source names a file and the per-user default does
/// not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config file, only if present
    default_config_path().filter(|p| p.exists())
}

/// Load the effective configuration
///
/// Missing file → warning + compiled defaults. Environment overrides are
/// applied last, then the result is validated.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let config = TomlConfig::load(&path)?;
            info!("Configuration loaded from {}", path.display());
            config
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            TomlConfig::default()
        }
        None => {
            debug!("No config file configured, using compiled defaults");
            TomlConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
