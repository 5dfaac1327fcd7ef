//! Item writes.
//!
//! Writes are not cached or de-duplicated. Once the remote service accepts a
//! write, every cached item and genre read is dropped. A failure to drop them
//! is logged and never reported as a failed write.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::UserContext;
use crate::cache::CacheStorage;
use crate::remote::api_types::decode_rows;
use crate::remote::{Filter, RemoteDataService};

use super::client::{ItemClient, ITEM_TABLE};
use super::error::{ItemError, ItemResult};
use super::keys::{GENRE_NAMESPACE, ITEM_NAMESPACE};
use super::types::{InsertRow, Item, ItemPatch, NewItem};

/// Filters pinning a write to one item of one user.
fn owned_item(user: &UserContext, item_key: &str) -> [Filter; 2] {
  [
    Filter::eq("key", item_key),
    Filter::eq("userId", user.user_id.as_str()),
  ]
}

fn first_item(rows: Vec<Value>) -> ItemResult<Option<Item>> {
  let items: Vec<Item> = decode_rows(rows)?;
  Ok(items.into_iter().next())
}

impl<R: RemoteDataService, S: CacheStorage> ItemClient<R, S> {
  /// Create an item owned by `user`.
  ///
  /// The image reference stays with the caller; only item columns are sent.
  pub async fn create_item(&self, user: &UserContext, item: &NewItem) -> ItemResult<Item> {
    let row = serde_json::to_value(InsertRow {
      fields: &item.fields,
      user_id: &user.user_id,
    })?;

    let rows = self.remote.insert(ITEM_TABLE, row).await?;
    self.invalidate();

    let created = first_item(rows)?.ok_or(ItemError::InsertFailed)?;
    info!(user_id = %user.user_id, item_key = %created.key, "created item");
    if let Some(image) = &item.image {
      debug!(item_key = %created.key, image = %image.0, "image awaiting upload");
    }
    Ok(created)
  }

  /// Overwrite the settable fields of one of the user's items.
  pub async fn update_item(&self, user: &UserContext, patch: &ItemPatch) -> ItemResult<Item> {
    let body = serde_json::to_value(&patch.fields)?;

    let rows = self
      .remote
      .update(ITEM_TABLE, body, &owned_item(user, &patch.key))
      .await?;
    self.invalidate();

    let updated = first_item(rows)?.ok_or(ItemError::UpdateFailed)?;
    info!(user_id = %user.user_id, item_key = %updated.key, "updated item");
    Ok(updated)
  }

  /// Delete one of the user's items. Deleting an unknown key succeeds.
  pub async fn delete_item(&self, user: &UserContext, item_key: &str) -> ItemResult<()> {
    let removed = self
      .remote
      .delete(ITEM_TABLE, &owned_item(user, item_key))
      .await?;
    self.invalidate();

    if removed == 0 {
      debug!(user_id = %user.user_id, item_key, "delete matched no item");
    } else {
      info!(user_id = %user.user_id, item_key, "deleted item");
    }
    Ok(())
  }

  /// Drop every cached read an item write can affect.
  fn invalidate(&self) {
    for namespace in [ITEM_NAMESPACE, GENRE_NAMESPACE] {
      match self.cache.invalidate(namespace) {
        Ok(removed) => debug!(namespace, removed, "invalidated cached reads"),
        Err(e) => warn!(namespace, error = %e, "failed to invalidate cached reads"),
      }
    }
  }
}
