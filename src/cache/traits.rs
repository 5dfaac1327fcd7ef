//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Identifies one cached query result.
pub trait QueryKey {
  /// Group this key is invalidated with.
  fn namespace(&self) -> &'static str;

  /// Canonical text form. Distinct queries must produce distinct strings.
  fn canonical(&self) -> String;

  /// Human-readable form for logs and the SQLite table.
  fn description(&self) -> String {
    self.canonical()
  }

  /// SHA256 of namespace + canonical form, for stable fixed-length keys.
  fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.namespace().as_bytes());
    hasher.update(b":");
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }
}

#[derive(Debug, Error)]
pub enum CacheError {
  #[error("cache storage error: {0}")]
  Storage(String),

  #[error("cache serialization error: {0}")]
  Serialize(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for CacheError {
  fn from(err: rusqlite::Error) -> Self {
    CacheError::Storage(err.to_string())
  }
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the remote service by this call
  Network,
  /// Served from a fresh cache entry
  Cache,
}
