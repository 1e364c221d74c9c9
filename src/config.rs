// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::CameraBackendType;
use crate::constants::{APP_ID, detection};
use crate::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "config.json";

/// Where the denial notice's "Settings" action sends the user
///
/// Opened as `app target`, e.g. `gnome-control-center camera`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsLink {
    /// Settings application to launch
    pub app: String,
    /// Page/panel argument passed to it
    pub target: String,
}

impl Default for SettingsLink {
    fn default() -> Self {
        Self {
            app: "gnome-control-center".to_string(),
            target: "camera".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use (PipeWire or V4L2)
    pub backend: CameraBackendType,
    /// Index into the enumerated camera list used as the default device
    pub camera_index: usize,
    /// Longest side, in pixels, frames are downscaled to before decoding
    pub max_dimension: u32,
    /// Initial directory of the gallery picker (None = Pictures directory)
    pub gallery_dir: Option<PathBuf>,
    /// Deep link opened from the permission denial notice
    pub settings_link: SettingsLink,
    /// Mirror camera preview horizontally
    pub mirror_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            camera_index: 0,
            max_dimension: detection::DEFAULT_MAX_DIMENSION,
            gallery_dir: None,
            settings_link: SettingsLink::default(),
            mirror_preview: false,
        }
    }
}

impl Config {
    /// Default config file location (`$XDG_CONFIG_HOME/barcode-scanner/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE))
    }

    /// Load the config from the default location
    ///
    /// Never fails: a missing file yields defaults, an unreadable or invalid
    /// file is logged and also yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("No config directory available, using default config");
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load the config from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), backend = %config.backend, "Loaded config");
        Ok(config.sanitized())
    }

    /// Directory the gallery picker opens in
    pub fn gallery_directory(&self) -> PathBuf {
        self.gallery_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        })
    }

    fn sanitized(mut self) -> Self {
        if self.max_dimension < 64 {
            warn!(
                max_dimension = self.max_dimension,
                "max_dimension too small, using default"
            );
            self.max_dimension = detection::DEFAULT_MAX_DIMENSION;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{ "camera_index": 2 }"#).unwrap();
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.max_dimension, detection::DEFAULT_MAX_DIMENSION);
        assert_eq!(config.settings_link, SettingsLink::default());
    }

    #[test]
    fn test_tiny_max_dimension_is_replaced() {
        let config = Config {
            max_dimension: 8,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.max_dimension, detection::DEFAULT_MAX_DIMENSION);
    }
}
