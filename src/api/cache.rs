//! Cache envelope files: last-known-good snapshots of remote reads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::types::{Item, Location};
use crate::error::{Error, Result};

pub const ITEMS_CACHE_FILE: &str = "items.cache.json";
pub const LOCATIONS_CACHE_FILE: &str = "locations.cache.json";

/// Timestamped snapshot of the last successful items fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsEnvelope {
  pub timestamp: i64,
  pub items: Vec<Item>,
}

/// Timestamped snapshot of the last successful locations fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationsEnvelope {
  pub timestamp: i64,
  pub locations: Vec<Location>,
}

/// Owns the two envelope files under the device's base path. An envelope is
/// replaced wholesale on every successful non-empty fetch, never merged.
#[derive(Debug, Clone)]
pub struct CacheStore {
  base: PathBuf,
}

impl CacheStore {
  pub fn new(base: impl Into<PathBuf>) -> Self {
    Self { base: base.into() }
  }

  fn path(&self, file: &str) -> PathBuf {
    self.base.join(file)
  }

  pub fn save_items(&self, items: &[Item]) -> Result<()> {
    let envelope = ItemsEnvelope {
      timestamp: Utc::now().timestamp(),
      items: items.to_vec(),
    };
    let path = self.path(ITEMS_CACHE_FILE);
    debug!(path = %path.display(), count = items.len(), "saving items cache");
    write_envelope(&path, &envelope)?;
    Ok(())
  }

  /// Load the last items snapshot. Any failure (no file, unreadable,
  /// corrupt) reads as a cache miss.
  pub fn load_items(&self) -> Result<Vec<Item>> {
    let envelope: ItemsEnvelope = read_envelope(&self.path(ITEMS_CACHE_FILE))?;
    debug!(
      count = envelope.items.len(),
      cached_at = envelope.timestamp,
      "loaded items cache"
    );
    Ok(envelope.items)
  }

  pub fn save_locations(&self, locations: &[Location]) -> Result<()> {
    let envelope = LocationsEnvelope {
      timestamp: Utc::now().timestamp(),
      locations: locations.to_vec(),
    };
    let path = self.path(LOCATIONS_CACHE_FILE);
    debug!(path = %path.display(), count = locations.len(), "saving locations cache");
    write_envelope(&path, &envelope)?;
    Ok(())
  }

  pub fn load_locations(&self) -> Result<Vec<Location>> {
    let envelope: LocationsEnvelope = read_envelope(&self.path(LOCATIONS_CACHE_FILE))?;
    debug!(
      count = envelope.locations.len(),
      cached_at = envelope.timestamp,
      "loaded locations cache"
    );
    Ok(envelope.locations)
  }
}

/// Write pretty-printed JSON through a temp file and rename, so a crash
/// mid-write leaves the previous snapshot intact.
fn write_envelope<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
  let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, data)?;
  fs::rename(&tmp, path)
}

fn read_envelope<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let data = fs::read(path).map_err(|e| {
    warn!(path = %path.display(), error = %e, "cache file not readable");
    Error::CacheMiss
  })?;
  serde_json::from_slice(&data).map_err(|e| {
    warn!(path = %path.display(), error = %e, "cache file corrupt");
    Error::CacheMiss
  })
}
