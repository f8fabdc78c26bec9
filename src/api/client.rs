//! Raw REST client for the remote inventory service. No caching here; see
//! [`super::cached`] for the cache-backed wrapper.

use std::time::Duration;

use color_eyre::eyre::eyre;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::api::types::{Commit, Item, Location};
use crate::error::{Error, Result};

/// Client-side bound on every network call; a hung request occupies its
/// caller until this fires.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the inventory service. One shared connection pool serves
/// both the read and write paths.
#[derive(Debug, Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: String,
  api_key: String,
}

impl ApiClient {
  pub fn new(base_url: &str, api_key: &str) -> color_eyre::Result<Self> {
    let url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API URL {}: {}", base_url, e))?;
    let base = url.as_str().trim_end_matches('/').to_string();

    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      api_key: api_key.to_string(),
    })
  }

  /// Every request carries the key twice: as a bearer token and as the
  /// service's `apikey` header.
  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.bearer_auth(&self.api_key).header("apikey", &self.api_key)
  }

  pub async fn fetch_items(&self) -> Result<Vec<Item>> {
    let url = format!("{}/rest/v1/items?select=*", self.base);
    debug!(%url, "fetching items");

    let resp = self
      .auth(self.http.get(&url))
      .send()
      .await
      .map_err(Error::from_reqwest)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Remote(status.as_u16()));
    }

    let body = resp.bytes().await.map_err(Error::from_reqwest)?;
    let items: Vec<Item> = serde_json::from_slice(&body).map_err(Error::Malformed)?;
    debug!(count = items.len(), "fetched items");
    Ok(items)
  }

  pub async fn fetch_locations(&self) -> Result<Vec<Location>> {
    let url = format!("{}/rest/v1/locations?select=*", self.base);
    debug!(%url, "fetching locations");

    let resp = self
      .auth(self.http.get(&url))
      .send()
      .await
      .map_err(Error::from_reqwest)?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Remote(status.as_u16()));
    }

    let body = resp.bytes().await.map_err(Error::from_reqwest)?;
    let locations: Vec<Location> = serde_json::from_slice(&body).map_err(Error::Malformed)?;
    debug!(count = locations.len(), "fetched locations");
    Ok(locations)
  }

  /// Post one commit. The response body is opaque beyond success; a body
  /// that is not a JSON object comes back as an empty map.
  pub async fn send_commit(&self, commit: &Commit) -> Result<Map<String, Value>> {
    let url = format!("{}/rest/v1/commits", self.base);
    debug!(location = %commit.location, item_id = commit.item_id, delta = commit.delta, "sending commit");

    let resp = self
      .auth(self.http.post(&url))
      .header("Prefer", "return=representation")
      .json(commit)
      .send()
      .await
      .map_err(Error::from_reqwest)?;

    let status = resp.status();
    let body = resp.bytes().await.unwrap_or_default();

    if status.as_u16() >= 400 {
      return Err(Error::Remote(status.as_u16()));
    }

    Ok(serde_json::from_slice(&body).unwrap_or_default())
  }

  /// Lightweight probe that a base URL + key combination works at all:
  /// a single-row read, any 2xx counts. Never raises.
  pub async fn check_credentials(&self) -> bool {
    let url = format!("{}/rest/v1/items?select=*&limit=1", self.base);

    match self.auth(self.http.get(&url)).send().await {
      Ok(resp) => resp.status().is_success(),
      Err(e) => {
        debug!(error = %e, "credential probe failed");
        false
      }
    }
  }
}
