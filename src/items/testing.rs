//! Fixtures shared by the item tests.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::UserContext;
use crate::cache::{CacheLayer, MemoryStorage};
use crate::remote::memory::MemoryService;

use super::client::ItemClient;
use super::types::Item;

pub const USER: &str = "user-1";
pub const OTHER_USER: &str = "user-2";

pub fn user() -> UserContext {
  user_with_id(USER)
}

pub fn user_with_id(user_id: &str) -> UserContext {
  UserContext {
    user_id: user_id.to_string(),
    access_token: None,
  }
}

/// A platform with the item view backed by the item table, plus a client on
/// top of it with an in-memory cache.
pub fn service() -> (Arc<MemoryService>, ItemClient<MemoryService, MemoryStorage>) {
  let service = Arc::new(
    MemoryService::new()
      .with_view("itemView", "item")
      .with_defaults("item", json!({"totalUseCount": 0})),
  );
  let client = ItemClient {
    remote: Arc::clone(&service),
    cache: CacheLayer::new(MemoryStorage::new()),
  };
  (service, client)
}

pub fn item_row(key: &str, user_id: &str, genre_key: &str, total_use_count: u32) -> Value {
  json!({
    "key": key,
    "genreKey": genre_key,
    "categoryKey": "sneakers",
    "brand": "Acme",
    "size": "M",
    "price": 100,
    "purchaseDate": "2023-01-15",
    "initialUseCount": 0,
    "totalUseCount": total_use_count,
    "userId": user_id
  })
}

pub fn keys(items: &[Item]) -> Vec<&str> {
  items.iter().map(|i| i.key.as_str()).collect()
}
