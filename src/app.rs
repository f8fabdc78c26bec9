use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;

use crate::api::cache::CacheStore;
use crate::api::cached::CachedClient;
use crate::api::client::ApiClient;
use crate::api::types::Commit;
use crate::config::Settings;
use crate::net::ConnectivityProbe;
use crate::queue::CommitQueue;

/// Everything the operator-facing commands need, constructed once in `main`
/// and passed down. The client and queue live here instead of in process
/// globals so commands can be exercised against fakes and temp dirs.
pub struct AppContext {
  settings: Settings,
  client: CachedClient,
  queue: CommitQueue,
  #[allow(dead_code)]
  base_path: PathBuf,
}

impl AppContext {
  pub fn new(settings: Settings, base_path: PathBuf) -> Result<Self> {
    if !settings.is_complete() {
      return Err(eyre!(
        "Settings incomplete: api_url and api_key must be set.\n\
         Run `wmsterm init --api-url <url> --api-key <key>` first."
      ));
    }

    std::fs::create_dir_all(&base_path)?;

    let api = ApiClient::new(&settings.api_url, &settings.api_key)?;
    let client = CachedClient::new(api, CacheStore::new(&base_path));
    let queue = CommitQueue::open(client.clone(), ConnectivityProbe::new(), &base_path);

    Ok(Self {
      settings,
      client,
      queue,
      base_path,
    })
  }

  /// List items; degrades to the last cached snapshot when offline.
  pub async fn list_items(&self) -> Result<()> {
    let items = self.client.fetch_items().await?;
    for item in &items {
      println!("{:>6}  {}", item.id, item.name);
    }
    println!("{} item(s)", items.len());
    Ok(())
  }

  /// List locations; degrades to the last cached snapshot when offline.
  pub async fn list_locations(&self) -> Result<()> {
    let locations = self.client.fetch_locations().await?;
    for loc in &locations {
      let ids: Vec<String> = loc.items.iter().map(|id| id.to_string()).collect();
      println!("{:<12}  [{}]", loc.name, ids.join(", "));
    }
    println!("{} location(s)", locations.len());
    Ok(())
  }

  /// Probe the configured URL and key against the service.
  pub async fn check(&self) -> Result<()> {
    if self.client.check_credentials().await {
      println!("Credentials OK");
      Ok(())
    } else {
      Err(eyre!("Credential check failed: service unreachable or key rejected"))
    }
  }

  /// Queue an inventory delta. Always succeeds locally; delivery happens in
  /// the background the next time the sync worker finds the network up.
  pub async fn submit_commit(&self, location: String, item_id: i64, delta: i64) -> Result<()> {
    let commit = Commit {
      device_id: self.settings.device_id.clone(),
      location,
      delta,
      item_id,
    };
    self.queue.submit(commit).await;
    println!("Commit queued ({} pending)", self.queue.depth().await);
    Ok(())
  }

  /// Show commits still waiting to be delivered.
  pub async fn show_pending(&self) -> Result<()> {
    let pending = self.queue.pending().await;
    for commit in &pending {
      println!(
        "{:<12}  item {:>6}  delta {:>5}  ({})",
        commit.location, commit.item_id, commit.delta, commit.device_id
      );
    }
    println!("{} pending commit(s)", pending.len());
    Ok(())
  }

  /// Run the background sync worker until interrupted.
  pub async fn run(&mut self) -> Result<()> {
    info!(depth = self.queue.depth().await, "starting sync worker");
    self.queue.start();
    println!("Sync worker running; Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;

    println!("Stopping...");
    self.queue.stop().await;
    Ok(())
  }
}
