//! Persisted shell settings.
//!
//! Only the command-line shell reads or writes these; the pipeline takes
//! everything it needs as arguments.

use crate::error::{StitchError, StitchResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_ENV: &str = "IMAGE_STITCH_SETTINGS";
const APP_DIR: &str = "image-stitch";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_folder: Option<PathBuf>,
}

impl Settings {
    /// `$IMAGE_STITCH_SETTINGS`, else `<config dir>/image-stitch/settings.json`.
    pub fn default_path() -> PathBuf {
        env::var(SETTINGS_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR)
                    .join(SETTINGS_FILE)
            })
    }

    /// Missing file means defaults; a malformed one is an error.
    pub fn load(path: &Path) -> StitchResult<Self> {
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|e| StitchError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|source| StitchError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> StitchResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StitchError::io(parent, e))?;
            }
        }
        let raw = serde_json::to_string_pretty(self).map_err(|source| StitchError::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, raw).map_err(|e| StitchError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("none.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_keeps_last_folder() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            last_folder: Some(PathBuf::from("/photos/trip")),
        };
        settings.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["last_folder"], "/photos/trip");
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(StitchError::Settings { .. })
        ));
    }
}
