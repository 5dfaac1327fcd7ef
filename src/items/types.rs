use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A tracked belonging, as read from the item view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
  pub key: String,
  pub genre_key: String,
  pub category_key: String,
  pub brand: String,
  pub size: String,
  pub price: f64,
  pub purchase_date: NaiveDate,
  pub initial_use_count: u32,
  /// Accumulated from calendar usage by the platform
  #[serde(default)]
  pub total_use_count: u32,
  pub user_id: String,
}

/// The columns a user may set on an item.
///
/// Writes serialize exactly this struct, so owner and total use count are
/// never sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
  pub genre_key: String,
  pub category_key: String,
  pub brand: String,
  pub size: String,
  pub price: f64,
  pub purchase_date: NaiveDate,
  pub initial_use_count: u32,
}

/// Reference to a picture of the item. Uploading it is someone else's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(pub String);

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
  pub fields: ItemFields,
  pub image: Option<ImageRef>,
}

/// Input for updating an item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPatch {
  pub key: String,
  pub fields: ItemFields,
}

/// Row sent on insert: the settable fields plus the owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertRow<'a> {
  #[serde(flatten)]
  pub fields: &'a ItemFields,
  pub user_id: &'a str,
}

/// A day's usage record with its item joined in.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CalendarWithItem {
  #[serde(default)]
  pub item_view: Option<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
  pub key: String,
  pub name: String,
  #[serde(default)]
  pub item_count: u32,
  #[serde(default)]
  pub item_total_used_count: u32,
}

/// Per-user totals over all items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
  pub count: u32,
  pub price: f64,
  pub total_use_count: u32,
  pub user_id: String,
}

impl ItemSummary {
  /// Summary of a user who has no items yet.
  pub fn empty(user_id: &str) -> Self {
    Self {
      count: 0,
      price: 0.0,
      total_use_count: 0,
      user_id: user_id.to_string(),
    }
  }
}
