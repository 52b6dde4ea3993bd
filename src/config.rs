//! Pack configuration stored as JSON under the user's home directory

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::{catalogue, config};
use crate::errstate::FloatErrorSettings;

/// User-tunable settings for the node pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Root of every node category path and prefix of unique node names
    pub category_prefix: String,
    /// Floating-point error modes installed at start-up
    pub float_errors: FloatErrorSettings,
    /// env_logger filter, used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            category_prefix: catalogue::DEFAULT_PREFIX.to_string(),
            float_errors: FloatErrorSettings::default(),
            log_filter: None,
        }
    }
}

impl PackConfig {
    /// `~/.nodle/numeric.json`, if a home directory can be found
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(config::DIRECTORY).join(config::FILE_NAME))
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        let config: PackConfig =
            serde_json::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the default location, or defaults when there is no home directory
    pub fn load_default() -> Result<Self, String> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
        Ok(())
    }
}
