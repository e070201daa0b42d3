use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{NotasError, Result};

pub const DEFAULT_STORAGE_KEY: &str = "notes_key";
const CONFIG_FILE_NAME: &str = "config.json";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the notes blob
    pub data_dir: PathBuf,

    /// Name of the blob the collection is stored under
    pub storage_key: String,

    /// chrono format used when printing dates
    pub date_format: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".notas"));

        Self {
            data_dir,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            date_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl Config {
    /// Where the configuration lives when no explicit path is given
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration at `path` (or the default location).
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            debug!("No configuration directory available, using defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&content).map_err(|e| NotasError::ConfigError {
            message: format!("Invalid configuration in {}: {}", path.display(), e),
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Writes the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| NotasError::DirectoryError {
                path: parent.to_path_buf(),
            })?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let key = self.storage_key.trim();
        if key.is_empty() || key.contains(['/', '\\']) {
            return Err(NotasError::ConfigError {
                message: format!("Invalid storage key '{}'", self.storage_key),
            });
        }
        Ok(())
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("app", "notas", "notas")
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(Some(&temp.path().join("absent.json"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn partial_file_falls_back_per_field() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "storage_key": "work_notes" }"#).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.storage_key, "work_notes");
        assert_eq!(config.date_format, Config::default().date_format);
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let config = Config {
            data_dir: temp.path().join("data"),
            storage_key: "personal".to_string(),
            date_format: "%d/%m/%Y".to_string(),
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn storage_key_must_be_a_plain_name() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{ "storage_key": "../escape" }"#).unwrap();

        assert!(matches!(
            Config::load(Some(&path)),
            Err(NotasError::ConfigError { .. })
        ));
    }
}
