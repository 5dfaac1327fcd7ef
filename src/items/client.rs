use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheLayer, CacheStorage, QueryKey};
use crate::remote::api_types::decode_rows;
use crate::remote::{RemoteDataService, Select};

use super::error::{ItemError, ItemResult};

/// Read-only view joining items with their accumulated usage
pub(crate) const ITEM_VIEW: &str = "itemView";
/// Writable item table
pub(crate) const ITEM_TABLE: &str = "item";
pub(crate) const CALENDAR_TABLE: &str = "calendar";
pub(crate) const SUMMARY_VIEW: &str = "itemSummary";
pub(crate) const GENRE_TABLE: &str = "genre";

/// Item data access with transparent caching.
///
/// Every call takes the user explicitly and scopes the remote request to that
/// user's id; nothing is read from ambient session state.
pub struct ItemClient<R: RemoteDataService, S: CacheStorage> {
  pub(crate) remote: Arc<R>,
  pub(crate) cache: CacheLayer<S>,
}

impl<R: RemoteDataService, S: CacheStorage> ItemClient<R, S> {
  pub fn new(remote: R, cache: CacheLayer<S>) -> Self {
    Self {
      remote: Arc::new(remote),
      cache,
    }
  }

  /// Cached read of a collection, decoded into `T` rows.
  pub(crate) async fn cached_rows<K, T>(
    &self,
    key: &K,
    collection: &'static str,
    query: Select,
  ) -> ItemResult<Vec<T>>
  where
    K: QueryKey,
    T: Serialize + DeserializeOwned,
  {
    let remote = Arc::clone(&self.remote);
    let result = self
      .cache
      .fetch(key, || async move {
        let rows = remote.select(collection, &query).await?;
        Ok::<_, ItemError>(decode_rows(rows)?)
      })
      .await?;
    debug!(
      collection,
      source = ?result.source,
      cached_at = ?result.cached_at,
      "rows ready"
    );
    Ok(result.data)
  }
}

impl<R: RemoteDataService, S: CacheStorage> Clone for ItemClient<R, S> {
  fn clone(&self) -> Self {
    Self {
      remote: Arc::clone(&self.remote),
      cache: self.cache.clone(),
    }
  }
}
