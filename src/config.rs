use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::cache::DEFAULT_CAPACITY;
use crate::core::loader::CATALOG_KEY;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "lull.json";

/// Subdirectory of the data directory dedicated to scene storage
pub const SCENES_DIR: &str = "scenes";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (LULL_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var("LULL_CONFIG_DIR").ok().map(PathBuf::from));

        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. LULL_CONFIG_DIR environment variable
/// 3. Platform-specific config directory from dirs-next (default)
///
/// Platform paths:
/// - Linux: ~/.config/lull/{name}
/// - macOS: ~/Library/Application Support/lull/{name}
/// - Windows: %APPDATA%\lull\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Get path to a data file (scene storage, logs)
///
/// Same priority as [`config_file`], falling back to the platform data directory.
/// - Linux: ~/.local/share/lull/{name}
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Ensure that configuration and data directories exist
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }

    // Only create data_dir if it's different from config_dir
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }

    Ok(())
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    dirs_next::config_dir()
        .map(|dir| dir.join("lull"))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    dirs_next::data_dir()
        .map(|dir| dir.join("lull"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Service settings (lull.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Max entries in the catalog cache (min 1)
    pub cache_capacity: usize,
    /// Catalog file name, also the cache key
    pub catalog_name: String,
    /// Scene storage directory; default `<data dir>/scenes`
    pub storage_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            catalog_name: CATALOG_KEY.to_string(),
            storage_dir: None,
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Settings =
            serde_json::from_str(&raw).with_context(|| format!("Invalid settings file: {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Settings from the config directory of `paths`
    pub fn load_for(paths: &PathConfig) -> Result<Self> {
        Self::load(&config_file(SETTINGS_FILE, paths))
    }

    /// Directory dedicated to scene storage
    pub fn scenes_dir(&self, paths: &PathConfig) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| data_file(SCENES_DIR, paths))
    }
}
