//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::storage::CacheStorage;
use super::traits::{CacheError, CacheResult, QueryKey};

type InFlight = Arc<tokio::sync::Mutex<()>>;

/// Cache layer that manages caching logic and network fetching.
///
/// Sits between the data-access code and the remote service. Errors from the
/// fetcher are returned as-is and never cached.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long before cached data is considered stale
  stale_time: Duration,
  /// One lock per query hash, held while that query is being fetched
  in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
  /// Bumped on every invalidation; results fetched across a bump are not stored
  generation: Arc<AtomicU64>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      stale_time: Duration::minutes(5),
      in_flight: Arc::new(Mutex::new(HashMap::new())),
      generation: Arc::new(AtomicU64::new(0)),
    }
  }

  /// Set the stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn is_stale(&self, cached_at: chrono::DateTime<Utc>) -> bool {
    Utc::now() - cached_at >= self.stale_time
  }

  /// Look up a fresh, decodable entry.
  fn fresh<T: DeserializeOwned>(&self, hash: &str) -> Result<Option<CacheResult<T>>, CacheError> {
    let Some(cached) = self.storage.get(hash)? else {
      return Ok(None);
    };
    if self.is_stale(cached.cached_at) {
      return Ok(None);
    }
    match serde_json::from_value(cached.payload) {
      Ok(data) => Ok(Some(CacheResult::from_cache(data, cached.cached_at))),
      Err(e) => {
        // Entry written by an older build; refetch it
        debug!(hash, error = %e, "discarding undecodable cache entry");
        Ok(None)
      }
    }
  }

  fn slot(&self, hash: &str) -> Result<InFlight, CacheError> {
    let mut in_flight = self
      .in_flight
      .lock()
      .map_err(|e| CacheError::Storage(format!("Lock poisoned: {}", e)))?;
    Ok(Arc::clone(in_flight.entry(hash.to_string()).or_default()))
  }

  fn release(&self, hash: &str, slot: InFlight) {
    if let Ok(mut in_flight) = self.in_flight.lock() {
      // Only the map and this caller hold it: nobody else is waiting
      if Arc::strong_count(&slot) <= 2 {
        in_flight.remove(hash);
      }
    }
  }

  /// Fetch with cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. Otherwise wait for any in-flight fetch of the same key, then check again
  /// 3. Fetch from network and store the result
  pub async fn fetch<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    K: QueryKey,
    T: Serialize + DeserializeOwned,
    E: From<CacheError>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let hash = key.cache_hash();

    if let Some(hit) = self.fresh(&hash)? {
      debug!(query = %key.description(), "cache hit");
      return Ok(hit);
    }

    let slot = self.slot(&hash)?;
    let result: Result<CacheResult<T>, E> = async {
      let _guard = slot.lock().await;

      // Another caller may have filled it while we waited
      if let Some(hit) = self.fresh(&hash)? {
        debug!(query = %key.description(), "cache hit after wait");
        Ok(hit)
      } else {
        debug!(query = %key.description(), "cache miss");
        let generation = self.generation.load(Ordering::SeqCst);
        match fetcher().await {
          Ok(data) => {
            if self.generation.load(Ordering::SeqCst) == generation {
              let payload = serde_json::to_value(&data).map_err(CacheError::from)?;
              self
                .storage
                .put(&hash, key.namespace(), &key.description(), &payload)?;
            }
            Ok(CacheResult::from_network(data))
          }
          Err(e) => Err(e),
        }
      }
    }
    .await;
    self.release(&hash, slot);
    result
  }

  /// Drop every cached result in `namespace`.
  pub fn invalidate(&self, namespace: &str) -> Result<usize, CacheError> {
    self.generation.fetch_add(1, Ordering::SeqCst);
    let removed = self.storage.invalidate_namespace(namespace)?;
    debug!(namespace, removed, "invalidated cache namespace");
    Ok(removed)
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      stale_time: self.stale_time,
      in_flight: Arc::clone(&self.in_flight),
      generation: Arc::clone(&self.generation),
    }
  }
}
