//! Configuration
//!
//! One small TOML file next to the binary. Loading a missing file writes
//! the defaults back out so there is always a config on disk to edit.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration system errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read or write the config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML content
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize config to TOML
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Config version for future migration support
    pub version: u32,

    /// Command name of the game process to attach to
    pub process_name: String,

    /// Game install directory; defaults to the directory the game module
    /// was loaded from
    pub game_dir: Option<PathBuf>,

    /// Base names of alias files to apply; empty applies all of them
    pub alias_files: Vec<String>,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            process_name: "blackops3".to_string(),
            game_dir: None,
            alias_files: Vec::new(),
        }
    }
}

impl CadenceConfig {
    /// Load config from `path`, creating a default file if missing.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::debug!("loaded config from {}", path.display());
            Ok(config)
        } else {
            let default = Self::default();
            default.save(path)?;
            tracing::info!("created default config at {}", path.display());
            Ok(default)
        }
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Root of the game's loose sound data, given the directory the game
    /// module was loaded from.
    pub fn sound_dir(&self, module_dir: &Path) -> PathBuf {
        self.game_dir
            .clone()
            .unwrap_or_else(|| module_dir.to_path_buf())
            .join("share")
            .join("raw")
            .join("sound")
    }
}

/// Default config location: next to the working directory the tool runs in.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("cadence.toml")
}
