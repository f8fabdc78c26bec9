use std::time::Duration;
use tokio::net::TcpStream;

/// Default probe target: a well-known always-up host, checked at the TCP
/// layer. Reaching it says the network is up, not that the backend is.
const DEFAULT_TARGET: &str = "8.8.8.8:443";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Coarse network reachability check.
///
/// Stateless: each call is a single bounded connection attempt, no retries.
/// Callers (the commit queue worker) decide the retry cadence.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
  target: String,
  timeout: Duration,
}

impl ConnectivityProbe {
  pub fn new() -> Self {
    Self {
      target: DEFAULT_TARGET.to_string(),
      timeout: DEFAULT_TIMEOUT,
    }
  }

  /// Probe a specific address instead of the default host.
  #[allow(dead_code)]
  pub fn with_target(target: impl Into<String>, timeout: Duration) -> Self {
    Self {
      target: target.into(),
      timeout,
    }
  }

  /// True only if a TCP connection is established within the timeout.
  /// Timeout, refusal, and resolution failures all read as unreachable.
  pub async fn is_reachable(&self) -> bool {
    matches!(
      tokio::time::timeout(self.timeout, TcpStream::connect(&self.target)).await,
      Ok(Ok(_))
    )
  }
}

impl Default for ConnectivityProbe {
  fn default() -> Self {
    Self::new()
  }
}
