//! Cache keys for item reads.

use serde_json::json;

use crate::cache::QueryKey;

/// Every item read lives here; item writes invalidate all of it.
pub const ITEM_NAMESPACE: &str = "item";
/// Genre counts are aggregates over items, so item writes invalidate these too.
pub const GENRE_NAMESPACE: &str = "genre";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
  Ascending,
  Descending,
}

impl SortDirection {
  pub fn is_ascending(self) -> bool {
    matches!(self, SortDirection::Ascending)
  }

  fn as_str(self) -> &'static str {
    match self {
      SortDirection::Ascending => "asc",
      SortDirection::Descending => "desc",
    }
  }
}

/// One variant per distinct item read. Every key carries the user it was
/// fetched for, so a shared cache never serves one user's rows to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemQueryKey {
  ByGenre { user_id: String, genre_key: String },
  ByCategory { user_id: String, category_key: String },
  /// Items ranked by total use count; the direction is part of the key
  UseRanking { user_id: String, direction: SortDirection },
  ByDate { user_id: String, date: String },
  Detail { user_id: String, item_key: String },
  Summary { user_id: String },
}

impl QueryKey for ItemQueryKey {
  fn namespace(&self) -> &'static str {
    ITEM_NAMESPACE
  }

  fn canonical(&self) -> String {
    // JSON arrays keep components unambiguous whatever characters they hold
    let parts = match self {
      Self::ByGenre { user_id, genre_key } => json!(["genre", user_id, genre_key]),
      Self::ByCategory {
        user_id,
        category_key,
      } => json!(["category", user_id, category_key]),
      Self::UseRanking { user_id, direction } => json!(["use_rank", user_id, direction.as_str()]),
      Self::ByDate { user_id, date } => json!(["date", user_id, date]),
      Self::Detail { user_id, item_key } => json!(["detail", user_id, item_key]),
      Self::Summary { user_id } => json!(["summary", user_id]),
    };
    parts.to_string()
  }

  fn description(&self) -> String {
    match self {
      Self::ByGenre { genre_key, .. } => format!("items in genre {}", genre_key),
      Self::ByCategory { category_key, .. } => format!("items in category {}", category_key),
      Self::UseRanking {
        direction: SortDirection::Descending,
        ..
      } => "best used items".to_string(),
      Self::UseRanking {
        direction: SortDirection::Ascending,
        ..
      } => "worst used items".to_string(),
      Self::ByDate { date, .. } => format!("items used on {}", date),
      Self::Detail { item_key, .. } => format!("item {}", item_key),
      Self::Summary { .. } => "item summary".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreQueryKey {
  List { user_id: String },
}

impl QueryKey for GenreQueryKey {
  fn namespace(&self) -> &'static str {
    GENRE_NAMESPACE
  }

  fn canonical(&self) -> String {
    match self {
      Self::List { user_id } => json!(["list", user_id]).to_string(),
    }
  }

  fn description(&self) -> String {
    "genres".to_string()
  }
}
