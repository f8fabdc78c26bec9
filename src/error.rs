use thiserror::Error;

/// Errors produced by the sync core (gateway + commit queue).
///
/// Read paths swallow `Transport`/`Remote`/`Malformed` internally and fall
/// back to the cache; callers only ever see `CacheMiss` or `Storage` from a
/// fetch. Write paths (`send_commit`) propagate all variants.
#[derive(Debug, Error)]
pub enum Error {
  /// Connection, DNS, or timeout failure before an HTTP response arrived.
  #[error("transport error: {0}")]
  Transport(#[source] reqwest::Error),

  /// The server answered with a non-success status.
  #[error("remote error: HTTP {0}")]
  Remote(u16),

  /// The response body did not decode as the expected shape.
  #[error("malformed response: {0}")]
  Malformed(#[source] serde_json::Error),

  /// The network attempt failed and no usable cache snapshot exists.
  #[error("no cached data available")]
  CacheMiss,

  /// A local file could not be read or written.
  #[error("storage error: {0}")]
  Storage(#[from] std::io::Error),
}

impl Error {
  /// Classify a reqwest failure: anything that carries an HTTP status is a
  /// remote error, everything else (connect, DNS, timeout) is transport.
  pub fn from_reqwest(err: reqwest::Error) -> Self {
    match err.status() {
      Some(status) => Error::Remote(status.as_u16()),
      None => Error::Transport(err),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
