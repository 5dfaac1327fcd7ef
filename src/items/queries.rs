//! Item reads.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::instrument;

use crate::auth::UserContext;
use crate::cache::CacheStorage;
use crate::remote::api_types::decode_rows;
use crate::remote::{RemoteDataService, Select};

use super::client::{ItemClient, CALENDAR_TABLE, GENRE_TABLE, ITEM_VIEW, SUMMARY_VIEW};
use super::error::{ItemError, ItemResult};
use super::keys::{GenreQueryKey, ItemQueryKey, SortDirection};
use super::types::{CalendarWithItem, Genre, Item, ItemSummary};

/// How many items the best/worst rankings show.
pub const RANKING_LIMIT: usize = 6;

impl<R: RemoteDataService, S: CacheStorage> ItemClient<R, S> {
  /// Items of one genre. `None` until a genre is chosen.
  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  pub async fn items_by_genre(
    &self,
    user: &UserContext,
    genre_key: Option<&str>,
  ) -> ItemResult<Option<Vec<Item>>> {
    let Some(genre_key) = genre_key else {
      return Ok(None);
    };
    let key = ItemQueryKey::ByGenre {
      user_id: user.user_id.clone(),
      genre_key: genre_key.to_string(),
    };
    let query = Select::all()
      .eq("genreKey", genre_key)
      .eq("userId", user.user_id.as_str());
    self.cached_rows(&key, ITEM_VIEW, query).await.map(Some)
  }

  /// Items of one category. `None` until a category is chosen.
  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  pub async fn items_by_category(
    &self,
    user: &UserContext,
    category_key: Option<&str>,
  ) -> ItemResult<Option<Vec<Item>>> {
    let Some(category_key) = category_key else {
      return Ok(None);
    };
    let key = ItemQueryKey::ByCategory {
      user_id: user.user_id.clone(),
      category_key: category_key.to_string(),
    };
    let query = Select::all()
      .eq("categoryKey", category_key)
      .eq("userId", user.user_id.as_str());
    self.cached_rows(&key, ITEM_VIEW, query).await.map(Some)
  }

  /// The most used items, highest total use count first.
  pub async fn best_used_items(&self, user: &UserContext) -> ItemResult<Vec<Item>> {
    self.ranked_items(user, SortDirection::Descending).await
  }

  /// The least used items, lowest total use count first.
  pub async fn worst_used_items(&self, user: &UserContext) -> ItemResult<Vec<Item>> {
    self.ranked_items(user, SortDirection::Ascending).await
  }

  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  async fn ranked_items(
    &self,
    user: &UserContext,
    direction: SortDirection,
  ) -> ItemResult<Vec<Item>> {
    let key = ItemQueryKey::UseRanking {
      user_id: user.user_id.clone(),
      direction,
    };
    let query = Select::all()
      .eq("userId", user.user_id.as_str())
      .order("totalUseCount", direction.is_ascending())
      .limit(RANKING_LIMIT);
    self.cached_rows(&key, ITEM_VIEW, query).await
  }

  /// Items used on a calendar day. `None` until a day is chosen.
  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  pub async fn items_by_date(
    &self,
    user: &UserContext,
    date: Option<NaiveDate>,
  ) -> ItemResult<Option<Vec<Item>>> {
    let Some(date) = date else {
      return Ok(None);
    };
    let date = date.format("%Y-%m-%d").to_string();
    let key = ItemQueryKey::ByDate {
      user_id: user.user_id.clone(),
      date: date.clone(),
    };
    let query = Select::all()
      .embed(ITEM_VIEW, "itemKey", "key")
      .eq("date", date)
      .eq("userId", user.user_id.as_str());

    let remote = Arc::clone(&self.remote);
    let result = self
      .cache
      .fetch(&key, || async move {
        let rows = remote.select(CALENDAR_TABLE, &query).await?;
        let entries: Vec<CalendarWithItem> = decode_rows(rows)?;
        // Entries whose item has since been deleted join to nothing
        let items: Vec<Item> = entries.into_iter().filter_map(|e| e.item_view).collect();
        Ok::<_, ItemError>(items)
      })
      .await?;
    Ok(Some(result.data))
  }

  /// One item by key, or `None` if the user has no such item.
  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  pub async fn item(&self, user: &UserContext, item_key: Option<&str>) -> ItemResult<Option<Item>> {
    let Some(item_key) = item_key else {
      return Ok(None);
    };
    let key = ItemQueryKey::Detail {
      user_id: user.user_id.clone(),
      item_key: item_key.to_string(),
    };
    let query = Select::all()
      .eq("key", item_key)
      .eq("userId", user.user_id.as_str());

    let remote = Arc::clone(&self.remote);
    let result = self
      .cache
      .fetch(&key, || async move {
        let rows = remote.select(ITEM_VIEW, &query).await?;
        let items: Vec<Item> = decode_rows(rows)?;
        Ok::<_, ItemError>(items.into_iter().next())
      })
      .await?;
    Ok(result.data)
  }

  /// The user's totals. A user without a summary row gets all zeros.
  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  pub async fn summary(&self, user: &UserContext) -> ItemResult<ItemSummary> {
    let key = ItemQueryKey::Summary {
      user_id: user.user_id.clone(),
    };
    let query = Select::all().eq("userId", user.user_id.as_str());
    let user_id = user.user_id.clone();

    let remote = Arc::clone(&self.remote);
    let result = self
      .cache
      .fetch(&key, || async move {
        let rows = remote.select(SUMMARY_VIEW, &query).await?;
        let summaries: Vec<ItemSummary> = decode_rows(rows)?;
        let summary = summaries
          .into_iter()
          .next()
          .unwrap_or_else(|| ItemSummary::empty(&user_id));
        Ok::<_, ItemError>(summary)
      })
      .await?;
    Ok(result.data)
  }

  /// The user's genres with their item counts.
  #[instrument(skip(self, user), fields(user_id = %user.user_id))]
  pub async fn genres(&self, user: &UserContext) -> ItemResult<Vec<Genre>> {
    let key = GenreQueryKey::List {
      user_id: user.user_id.clone(),
    };
    let query = Select::all()
      .eq("userId", user.user_id.as_str())
      .order("key", true);
    self.cached_rows(&key, GENRE_TABLE, query).await
  }
}
