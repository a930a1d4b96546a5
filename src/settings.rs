use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::*;

/// Tool configuration, read from `mapgen.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: u16,
    pub bind: String,
    pub output: PathBuf,
    /// Viewport assumed when popup widths are baked into a generated page.
    pub viewport_width: u32,
    pub leaflet_version: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            leaflet_version: LEAFLET_VERSION.to_string(),
        }
    }
}

impl Settings {
    /// Loads `path` when given, else the per-user config file; a missing
    /// default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::config_path() {
                Some(p) => (p, false),
                None => return Ok(Settings::default()),
            },
        };

        if !config_path.exists() {
            if required {
                anyhow::bail!("Config file {} not found", config_path.display());
            }
            debug!("no config at {}, using defaults", config_path.display());
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let settings = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        info!("loaded config from {}", config_path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mapgen").join(CONFIG_FILE_NAME))
    }
}
