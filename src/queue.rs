//! Durable commit queue: buffers inventory adjustments on disk and replays
//! them in the background once the network is reachable.
//!
//! A commit is only ever in one state: pending. Delivery removes it from the
//! persisted sequence; failure leaves it in place, in its original position,
//! for the next cycle. There is no retry cap and no backoff — every tick is
//! a full uniform retry pass.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::api::cached::CachedClient;
use crate::api::types::Commit;
use crate::net::ConnectivityProbe;

pub const QUEUE_FILE: &str = "pending_commits.json";
const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// FIFO of pending commits mirrored to `pending_commits.json`.
///
/// `submit` never blocks on the network; delivery happens on a background
/// task started with [`start`](Self::start). Submission order is retry
/// order, and a failing commit never blocks the ones behind it.
pub struct CommitQueue {
  inner: Arc<Inner>,
  stop_tx: watch::Sender<bool>,
  worker: Option<JoinHandle<()>>,
  interval: Duration,
}

struct Inner {
  client: CachedClient,
  probe: ConnectivityProbe,
  file_path: PathBuf,
  /// In-memory sequence, kept identical to the on-disk ordering. Submit and
  /// drain each hold this lock for their whole critical section.
  pending: Mutex<Vec<Commit>>,
}

impl CommitQueue {
  /// Open the queue at `base_path`, resuming whatever the last process
  /// persisted. A missing queue file is an empty queue.
  pub fn open(client: CachedClient, probe: ConnectivityProbe, base_path: impl AsRef<Path>) -> Self {
    let file_path = base_path.as_ref().join(QUEUE_FILE);
    let pending = load_queue(&file_path);
    if !pending.is_empty() {
      info!(depth = pending.len(), "resuming persisted commit queue");
    }

    Self {
      inner: Arc::new(Inner {
        client,
        probe,
        file_path,
        pending: Mutex::new(pending),
      }),
      stop_tx: watch::channel(false).0,
      worker: None,
      interval: CHECK_INTERVAL,
    }
  }

  /// Override the worker's tick interval (default 5 s).
  #[allow(dead_code)]
  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  /// Append a commit and rewrite the queue file. Never fails from the
  /// operator's point of view: a storage failure is logged and the commit
  /// stays in memory until the next successful rewrite, which may mean it
  /// is lost if the process exits first. Known limitation.
  pub async fn submit(&self, commit: Commit) {
    let mut pending = self.inner.pending.lock().await;
    debug!(
      location = %commit.location,
      item_id = commit.item_id,
      delta = commit.delta,
      "commit queued"
    );
    pending.push(commit);
    if let Err(e) = save_queue(&self.inner.file_path, &pending) {
      error!(error = %e, "failed to persist commit queue");
    }
  }

  /// Number of commits still awaiting delivery.
  pub async fn depth(&self) -> usize {
    self.inner.pending.lock().await.len()
  }

  /// Snapshot of the pending commits, in delivery order.
  pub async fn pending(&self) -> Vec<Commit> {
    self.inner.pending.lock().await.clone()
  }

  /// Launch the background worker. At most one runs per queue; calling
  /// `start` again while one is running is a no-op.
  pub fn start(&mut self) {
    if self.worker.is_some() {
      return;
    }

    let mut stop_rx = self.stop_tx.subscribe();
    let inner = Arc::clone(&self.inner);
    let period = self.interval;

    self.worker = Some(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        tokio::select! {
          _ = stop_rx.changed() => break,
          _ = ticker.tick() => {
            if inner.probe.is_reachable().await {
              inner.drain().await;
            } else {
              debug!("network unreachable, skipping drain");
            }
          }
        }
      }
      debug!("queue worker stopped");
    }));
  }

  /// Ask the worker to stop and wait for it. A drain pass that has already
  /// started completes and persists its result before this returns; the
  /// next `start` resumes from the persisted file.
  pub async fn stop(&mut self) {
    if let Some(handle) = self.worker.take() {
      let _ = self.stop_tx.send(true);
      let _ = handle.await;
    }
  }
}

impl Drop for CommitQueue {
  fn drop(&mut self) {
    if let Some(handle) = self.worker.take() {
      handle.abort();
    }
  }
}

impl Inner {
  /// One full drain pass. The lock is held for the whole pass, so no
  /// submission interleaves with the rewrite and the file always matches
  /// what was actually retried.
  ///
  /// Every commit is attempted in FIFO order; successes are dropped from
  /// the rebuilt sequence, failures keep their relative order.
  async fn drain(&self) {
    let mut pending = self.pending.lock().await;
    if pending.is_empty() {
      return;
    }

    info!(depth = pending.len(), "processing pending commits");

    let mut retained = Vec::new();
    for commit in pending.drain(..) {
      match self.client.send_commit(&commit).await {
        Ok(_) => {
          info!(
            location = %commit.location,
            item_id = commit.item_id,
            delta = commit.delta,
            "commit delivered"
          );
        }
        Err(e) => {
          warn!(
            error = %e,
            location = %commit.location,
            item_id = commit.item_id,
            "commit failed, keeping for next cycle"
          );
          retained.push(commit);
        }
      }
    }
    *pending = retained;

    if let Err(e) = save_queue(&self.file_path, &pending) {
      error!(error = %e, "failed to persist commit queue after drain");
    }
  }
}

/// An absent file is an empty queue; an unreadable or corrupt file is
/// treated the same, with a warning. The corrupt contents are abandoned.
fn load_queue(path: &Path) -> Vec<Commit> {
  let data = match fs::read(path) {
    Ok(data) => data,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "queue file not readable, starting empty");
      return Vec::new();
    }
  };

  match serde_json::from_slice(&data) {
    Ok(commits) => commits,
    Err(e) => {
      warn!(path = %path.display(), error = %e, "queue file corrupt, starting empty");
      Vec::new()
    }
  }
}

/// Full rewrite through a temp file and rename, so a crash mid-write never
/// leaves a half-written queue behind.
fn save_queue(path: &Path, commits: &[Commit]) -> io::Result<()> {
  let data = serde_json::to_vec_pretty(commits).map_err(io::Error::other)?;
  let tmp = path.with_extension("json.tmp");
  fs::write(&tmp, data)?;
  fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::cache::CacheStore;
  use crate::api::client::ApiClient;
  use std::path::Path;
  use tempfile::tempdir;
  use wiremock::matchers::{body_partial_json, method, path as url_path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn commit(item_id: i64) -> Commit {
    Commit {
      device_id: "D1".into(),
      location: "A1".into(),
      delta: -3,
      item_id,
    }
  }

  fn queue_at(base: &Path, api_url: &str, probe: ConnectivityProbe) -> CommitQueue {
    let client = ApiClient::new(api_url, "k").unwrap();
    let gateway = CachedClient::new(client, CacheStore::new(base));
    CommitQueue::open(gateway, probe, base).with_interval(Duration::from_millis(25))
  }

  fn read_queue_file(base: &Path) -> Vec<Commit> {
    serde_json::from_str(&fs::read_to_string(base.join(QUEUE_FILE)).unwrap()).unwrap()
  }

  /// An address with nothing listening behind it.
  async fn dead_addr() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
  }

  fn unreachable_probe(addr: &str) -> ConnectivityProbe {
    ConnectivityProbe::with_target(addr, Duration::from_millis(200))
  }

  #[tokio::test]
  async fn test_submit_persists_in_fifo_order() {
    let dir = tempdir().unwrap();
    let dead = dead_addr().await;
    let queue = queue_at(dir.path(), &format!("http://{}", dead), unreachable_probe(&dead));

    queue.submit(commit(1)).await;
    queue.submit(commit(2)).await;
    queue.submit(commit(3)).await;

    assert_eq!(queue.depth().await, 3);
    let on_disk = read_queue_file(dir.path());
    assert_eq!(
      on_disk.iter().map(|c| c.item_id).collect::<Vec<_>>(),
      vec![1, 2, 3]
    );
  }

  #[tokio::test]
  async fn test_reopen_resumes_persisted_queue() {
    let dir = tempdir().unwrap();
    let dead = dead_addr().await;
    let base_url = format!("http://{}", dead);

    let queue = queue_at(dir.path(), &base_url, unreachable_probe(&dead));
    queue.submit(commit(1)).await;
    queue.submit(commit(2)).await;
    drop(queue);

    let reopened = queue_at(dir.path(), &base_url, unreachable_probe(&dead));
    assert_eq!(reopened.depth().await, 2);
    assert_eq!(
      reopened
        .pending()
        .await
        .iter()
        .map(|c| c.item_id)
        .collect::<Vec<_>>(),
      vec![1, 2]
    );
  }

  #[tokio::test]
  async fn test_corrupt_queue_file_starts_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(QUEUE_FILE), b"{{ definitely not json").unwrap();

    let dead = dead_addr().await;
    let queue = queue_at(dir.path(), &format!("http://{}", dead), unreachable_probe(&dead));
    assert_eq!(queue.depth().await, 0);
  }

  #[tokio::test]
  async fn test_drain_keeps_only_failures_in_order() {
    let server = MockServer::start().await;
    // Commit 2 fails; 1 and 3 are accepted.
    Mock::given(method("POST"))
      .and(url_path("/rest/v1/commits"))
      .and(body_partial_json(serde_json::json!({"item_id": 2})))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;
    for accepted in [1, 3] {
      Mock::given(method("POST"))
        .and(url_path("/rest/v1/commits"))
        .and(body_partial_json(serde_json::json!({"item_id": accepted})))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": accepted})))
        .mount(&server)
        .await;
    }

    let dir = tempdir().unwrap();
    let queue = queue_at(
      dir.path(),
      &server.uri(),
      unreachable_probe(&dead_addr().await),
    );
    queue.submit(commit(1)).await;
    queue.submit(commit(2)).await;
    queue.submit(commit(3)).await;

    queue.inner.drain().await;

    // 3 was delivered even though 2 (ahead of it) failed, and the file
    // holds exactly the failure.
    let on_disk = read_queue_file(dir.path());
    assert_eq!(
      on_disk.iter().map(|c| c.item_id).collect::<Vec<_>>(),
      vec![2]
    );
    assert_eq!(queue.depth().await, 1);
  }

  #[tokio::test]
  async fn test_drain_persists_empty_queue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(url_path("/rest/v1/commits"))
      .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
      .mount(&server)
      .await;

    let dir = tempdir().unwrap();
    let queue = queue_at(
      dir.path(),
      &server.uri(),
      unreachable_probe(&dead_addr().await),
    );
    queue.submit(commit(1)).await;
    queue.inner.drain().await;

    assert!(read_queue_file(dir.path()).is_empty());
  }

  #[tokio::test]
  async fn test_no_drain_while_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(url_path("/rest/v1/commits"))
      .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({})))
      .expect(0)
      .mount(&server)
      .await;

    let dir = tempdir().unwrap();
    let dead = dead_addr().await;
    let mut queue = queue_at(dir.path(), &server.uri(), unreachable_probe(&dead));
    queue.submit(commit(1)).await;

    queue.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    queue.stop().await;

    // Untouched: the single submitted commit is still on disk.
    assert_eq!(read_queue_file(dir.path()).len(), 1);
  }

  #[tokio::test]
  async fn test_offline_submit_then_online_drain() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(url_path("/rest/v1/commits"))
      .and(body_partial_json(serde_json::json!({
        "device_id": "D1",
        "location": "A1",
        "delta": -3,
        "item_id": 42
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": 1})))
      .expect(1)
      .mount(&server)
      .await;

    let dir = tempdir().unwrap();

    // Offline: the probe target answers nothing, so the worker never drains
    // and the commit just sits in the file.
    let dead = dead_addr().await;
    let mut offline = queue_at(dir.path(), &server.uri(), unreachable_probe(&dead));
    offline.submit(commit(42)).await;
    offline.start();
    tokio::time::sleep(Duration::from_millis(150)).await;
    offline.stop().await;
    assert_eq!(read_queue_file(dir.path()).len(), 1);

    // Back online: a fresh queue resumes from the file, the probe now
    // reaches the server, and the next tick delivers the commit.
    let probe = ConnectivityProbe::with_target(
      server.address().to_string(),
      Duration::from_millis(500),
    );
    let mut online = queue_at(dir.path(), &server.uri(), probe);
    online.start();
    for _ in 0..40 {
      tokio::time::sleep(Duration::from_millis(50)).await;
      if read_queue_file(dir.path()).is_empty() {
        break;
      }
    }
    online.stop().await;

    assert!(read_queue_file(dir.path()).is_empty());
  }
}
