// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, FacingMode};
use crate::constants::upload::DEFAULT_SERVER_URL;
use crate::constants::v4l2::{PREFERRED_HEIGHT, PREFERRED_WIDTH};
use crate::errors::{AppError, AppResult, UploadError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name under the user's config directory
const APP_DIR: &str = "camera-uploader";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the snapshot server (`/upload` is appended)
    pub server_url: String,
    /// Camera requested by the first automatic start
    pub default_facing_mode: FacingMode,
    /// Whether the user may switch between front and back camera
    pub switch_control_enabled: bool,
    /// Camera backend to use (V4L2 or test pattern)
    pub backend: CameraBackendType,
    /// Resolution asked from the camera
    pub preferred_width: u32,
    pub preferred_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            default_facing_mode: FacingMode::User,
            switch_control_enabled: true,
            backend: CameraBackendType::default(),
            preferred_width: PREFERRED_WIDTH,
            preferred_height: PREFERRED_HEIGHT,
        }
    }
}

impl Config {
    /// Default config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location
    ///
    /// A missing or unreadable file yields the defaults; problems are logged.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults on any problem
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Load from `path`, returning an error if it cannot be read or parsed
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), ?config, "Loaded config");
        Ok(config)
    }

    /// Full snapshot endpoint derived from `server_url`
    pub fn upload_url(&self) -> Result<String, UploadError> {
        crate::uploader::transport::upload_url(&self.server_url)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "default_facing_mode": "environment" }"#).unwrap();
        assert_eq!(config.default_facing_mode, FacingMode::Environment);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.switch_control_enabled);
    }

    #[test]
    fn test_backend_names() {
        let config: Config = serde_json::from_str(r#"{ "backend": "test-pattern" }"#).unwrap();
        assert_eq!(config.backend, CameraBackendType::TestPattern);
    }
}
