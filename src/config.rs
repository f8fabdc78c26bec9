use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "settings.json";

/// Terminal settings, persisted as JSON under the device's base path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
  /// Base URL of the inventory service.
  #[serde(default)]
  pub api_url: String,
  /// API key, sent as both the bearer token and the `apikey` header.
  #[serde(default)]
  pub api_key: String,
  /// Device identifier stamped on every commit.
  #[serde(default = "default_device_id")]
  pub device_id: String,
}

fn default_device_id() -> String {
  "TOUGHPAD01".to_string()
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      api_url: String::new(),
      api_key: String::new(),
      device_id: default_device_id(),
    }
  }
}

impl Settings {
  pub fn load(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read settings file {}: {}", path.display(), e))?;

    let settings: Settings = serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse settings file {}: {}", path.display(), e))?;

    Ok(settings)
  }

  pub fn save(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create settings directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(self)?;
    std::fs::write(path, contents)
      .map_err(|e| eyre!("Failed to write settings file {}: {}", path.display(), e))?;

    Ok(())
  }

  /// Write a fresh settings file with empty credentials and the default
  /// device id, for first-run bootstrapping.
  pub fn create_default(path: &Path) -> Result<Self> {
    let settings = Settings::default();
    settings.save(path)?;
    Ok(settings)
  }

  /// True once both the URL and the key are filled in.
  pub fn is_complete(&self) -> bool {
    !self.api_url.is_empty() && !self.api_key.is_empty()
  }
}

/// Default base path for settings, caches, and the commit queue:
/// the platform data directory, e.g. `~/.local/share/wmsterm`.
pub fn default_base_path() -> Result<PathBuf> {
  dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .map(|p| p.join("wmsterm"))
    .ok_or_else(|| eyre!("Could not determine data directory"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn test_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE);

    let settings = Settings {
      api_url: "https://inventory.example.com".into(),
      api_key: "secret".into(),
      device_id: "PAD07".into(),
    };
    settings.save(&path).unwrap();

    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded.api_url, settings.api_url);
    assert_eq!(loaded.api_key, settings.api_key);
    assert_eq!(loaded.device_id, settings.device_id);
  }

  #[test]
  fn test_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(Settings::load(&dir.path().join(SETTINGS_FILE)).is_err());
  }

  #[test]
  fn test_create_default_is_incomplete() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(SETTINGS_FILE);

    let settings = Settings::create_default(&path).unwrap();
    assert!(!settings.is_complete());
    assert_eq!(settings.device_id, "TOUGHPAD01");
    assert!(path.exists());
  }

  #[test]
  fn test_missing_device_id_gets_default() {
    let settings: Settings =
      serde_json::from_str(r#"{"api_url": "https://x", "api_key": "k"}"#).unwrap();
    assert_eq!(settings.device_id, "TOUGHPAD01");
    assert!(settings.is_complete());
  }
}
