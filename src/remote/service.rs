use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::request::{Filter, Select};

/// Failure reported by the remote platform or on the way to it.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// The platform answered and rejected the call.
  #[error("{message} (status {status})")]
  Api {
    status: u16,
    code: Option<String>,
    message: String,
  },

  #[error("request failed: {0}")]
  Transport(String),

  #[error("unexpected response body: {0}")]
  Decode(String),
}

impl From<reqwest::Error> for RemoteError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      RemoteError::Decode(err.to_string())
    } else {
      RemoteError::Transport(err.to_string())
    }
  }
}

/// Reads and writes against named collections of the hosted platform.
///
/// Rows travel as JSON objects; callers decode them into their own types.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
  async fn select(&self, collection: &str, query: &Select) -> Result<Vec<Value>, RemoteError>;

  /// Insert one row, returning the stored representation.
  async fn insert(&self, collection: &str, row: Value) -> Result<Vec<Value>, RemoteError>;

  /// Patch every row matching `filters`, returning the rows affected.
  async fn update(
    &self,
    collection: &str,
    patch: Value,
    filters: &[Filter],
  ) -> Result<Vec<Value>, RemoteError>;

  /// Delete every row matching `filters`, returning how many were removed.
  async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<usize, RemoteError>;
}
