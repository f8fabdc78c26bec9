//! Cache-backed gateway: the raw client plus read-through caching and
//! degrade-to-cache fallback.
//!
//! Reads return the freshest data available and only fail hard when the
//! network attempt fails *and* no prior snapshot exists on disk. Writes are
//! never served from cache; a failed commit is the queue's job to retry.

use serde_json::{Map, Value};
use tracing::warn;

use crate::api::cache::CacheStore;
use crate::api::client::ApiClient;
use crate::api::types::{Commit, Item, Location};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct CachedClient {
  inner: ApiClient,
  cache: CacheStore,
}

impl CachedClient {
  pub fn new(inner: ApiClient, cache: CacheStore) -> Self {
    Self { inner, cache }
  }

  /// Fetch items, refreshing the cache on success and serving the last
  /// snapshot on any failure.
  ///
  /// Transport errors, error statuses, and undecodable bodies all take the
  /// same fallback path. A successful *empty* result is returned as-is but
  /// does not overwrite a previous non-empty snapshot; a transient empty
  /// answer must not wipe the last known good data.
  pub async fn fetch_items(&self) -> Result<Vec<Item>> {
    match self.inner.fetch_items().await {
      Ok(items) => {
        if !items.is_empty() {
          if let Err(e) = self.cache.save_items(&items) {
            warn!(error = %e, "failed to refresh items cache");
          }
        }
        Ok(items)
      }
      Err(e) => {
        warn!(error = %e, "items fetch failed, falling back to cache");
        self.cache.load_items()
      }
    }
  }

  /// Same contract as [`fetch_items`](Self::fetch_items), for locations.
  pub async fn fetch_locations(&self) -> Result<Vec<Location>> {
    match self.inner.fetch_locations().await {
      Ok(locations) => {
        if !locations.is_empty() {
          if let Err(e) = self.cache.save_locations(&locations) {
            warn!(error = %e, "failed to refresh locations cache");
          }
        }
        Ok(locations)
      }
      Err(e) => {
        warn!(error = %e, "locations fetch failed, falling back to cache");
        self.cache.load_locations()
      }
    }
  }

  /// Pass-through write. Errors propagate to the caller so the durable
  /// queue can keep the commit for the next cycle.
  pub async fn send_commit(&self, commit: &Commit) -> Result<Map<String, Value>> {
    self.inner.send_commit(commit).await
  }

  /// Pass-through credential probe.
  pub async fn check_credentials(&self) -> bool {
    self.inner.check_credentials().await
  }
}
