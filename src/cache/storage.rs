//! Cache storage trait and its backends.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::traits::CacheError;

/// A cached query result.
#[derive(Debug, Clone)]
pub struct CachedValue {
  pub payload: Value,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the cached result stored under a query hash.
  fn get(&self, query_hash: &str) -> Result<Option<CachedValue>, CacheError>;

  /// Store (or replace) a query result.
  fn put(
    &self,
    query_hash: &str,
    namespace: &str,
    description: &str,
    payload: &Value,
  ) -> Result<(), CacheError>;

  /// Drop every entry in a namespace. Returns how many were dropped.
  fn invalidate_namespace(&self, namespace: &str) -> Result<usize, CacheError>;
}

impl<S: CacheStorage + ?Sized> CacheStorage for Box<S> {
  fn get(&self, query_hash: &str) -> Result<Option<CachedValue>, CacheError> {
    (**self).get(query_hash)
  }

  fn put(
    &self,
    query_hash: &str,
    namespace: &str,
    description: &str,
    payload: &Value,
  ) -> Result<(), CacheError> {
    (**self).put(query_hash, namespace, description, payload)
  }

  fn invalidate_namespace(&self, namespace: &str) -> Result<usize, CacheError> {
    (**self).invalidate_namespace(namespace)
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _query_hash: &str) -> Result<Option<CachedValue>, CacheError> {
    Ok(None) // Always miss
  }

  fn put(&self, _: &str, _: &str, _: &str, _: &Value) -> Result<(), CacheError> {
    Ok(()) // Discard
  }

  fn invalidate_namespace(&self, _namespace: &str) -> Result<usize, CacheError> {
    Ok(0)
  }
}

/// Process-local storage.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, (String, CachedValue)>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, (String, CachedValue)>>, CacheError> {
    self
      .entries
      .lock()
      .map_err(|e| CacheError::Storage(format!("Lock poisoned: {}", e)))
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, query_hash: &str) -> Result<Option<CachedValue>, CacheError> {
    Ok(self.lock()?.get(query_hash).map(|(_, value)| value.clone()))
  }

  fn put(
    &self,
    query_hash: &str,
    namespace: &str,
    _description: &str,
    payload: &Value,
  ) -> Result<(), CacheError> {
    let value = CachedValue {
      payload: payload.clone(),
      cached_at: Utc::now(),
    };
    self
      .lock()?
      .insert(query_hash.to_string(), (namespace.to_string(), value));
    Ok(())
  }

  fn invalidate_namespace(&self, namespace: &str) -> Result<usize, CacheError> {
    let mut entries = self.lock()?;
    let before = entries.len();
    entries.retain(|_, (ns, _)| ns != namespace);
    Ok(before - entries.len())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_cache (
    query_hash TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    query_description TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_cache_namespace ON query_cache(namespace);
"#;

impl SqliteStorage {
  /// Open (or create) the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self, CacheError> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| CacheError::Storage(format!("Failed to create cache directory: {}", e)))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      CacheError::Storage(format!(
        "Failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;
    Self::with_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self, CacheError> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, CacheError> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| CacheError::Storage(format!("Failed to run cache migrations: {}", e)))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
    self
      .conn
      .lock()
      .map_err(|e| CacheError::Storage(format!("Lock poisoned: {}", e)))
  }
}

impl CacheStorage for SqliteStorage {
  fn get(&self, query_hash: &str) -> Result<Option<CachedValue>, CacheError> {
    let conn = self.lock()?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM query_cache WHERE query_hash = ?",
        params![query_hash],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((data, cached_at)) => Ok(Some(CachedValue {
        payload: serde_json::from_slice(&data)?,
        cached_at: parse_datetime(&cached_at)?,
      })),
      None => Ok(None),
    }
  }

  fn put(
    &self,
    query_hash: &str,
    namespace: &str,
    description: &str,
    payload: &Value,
  ) -> Result<(), CacheError> {
    let conn = self.lock()?;
    let data = serde_json::to_vec(payload)?;

    conn.execute(
      "INSERT OR REPLACE INTO query_cache (query_hash, namespace, query_description, data, cached_at)
       VALUES (?, ?, ?, ?, ?)",
      params![query_hash, namespace, description, data, Utc::now().to_rfc3339()],
    )?;

    Ok(())
  }

  fn invalidate_namespace(&self, namespace: &str) -> Result<usize, CacheError> {
    let conn = self.lock()?;
    let removed = conn.execute(
      "DELETE FROM query_cache WHERE namespace = ?",
      params![namespace],
    )?;
    Ok(removed)
  }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| CacheError::Storage(format!("Failed to parse datetime '{}': {}", s, e)))
}
