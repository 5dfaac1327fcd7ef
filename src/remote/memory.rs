//! In-process stand-in for the hosted platform, used by tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::request::{Filter, Select};
use super::service::{RemoteDataService, RemoteError};

#[derive(Default)]
struct Tables {
  rows: HashMap<String, Vec<Value>>,
  /// Read-only views that resolve to a backing table
  views: HashMap<String, String>,
  /// Column defaults applied on insert
  defaults: HashMap<String, Map<String, Value>>,
  next_key: u64,
  fail_next: Option<(u16, String)>,
}

/// Tables of JSON rows evaluated with the same filter/order/limit semantics
/// the platform applies.
#[derive(Default)]
pub struct MemoryService {
  tables: Mutex<Tables>,
  selects: AtomicUsize,
}

impl MemoryService {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reads of `view` see the rows of `table`.
  pub fn with_view(self, view: &str, table: &str) -> Self {
    self.lock().views.insert(view.to_string(), table.to_string());
    self
  }

  pub fn with_defaults(self, table: &str, defaults: Value) -> Self {
    if let Value::Object(map) = defaults {
      self.lock().defaults.insert(table.to_string(), map);
    }
    self
  }

  pub fn seed(&self, table: &str, rows: Vec<Value>) {
    self
      .lock()
      .rows
      .entry(table.to_string())
      .or_default()
      .extend(rows);
  }

  pub fn rows(&self, table: &str) -> Vec<Value> {
    self.lock().rows.get(table).cloned().unwrap_or_default()
  }

  /// Make the next call fail with an API error.
  pub fn fail_next(&self, status: u16, message: &str) {
    self.lock().fail_next = Some((status, message.to_string()));
  }

  /// Number of reads that reached this service.
  pub fn select_count(&self) -> usize {
    self.selects.load(AtomicOrdering::SeqCst)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
    self.tables.lock().unwrap()
  }
}

impl Tables {
  fn resolve<'a>(&'a self, collection: &'a str) -> &'a str {
    self
      .views
      .get(collection)
      .map(String::as_str)
      .unwrap_or(collection)
  }

  fn take_failure(&mut self) -> Result<(), RemoteError> {
    match self.fail_next.take() {
      Some((status, message)) => Err(RemoteError::Api {
        status,
        code: None,
        message,
      }),
      None => Ok(()),
    }
  }
}

fn matches(row: &Value, filters: &[Filter]) -> bool {
  filters.iter().all(|f| row.get(&f.column) == Some(&f.value))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
  match (a, b) {
    (Some(Value::Number(x)), Some(Value::Number(y))) => {
      let x = x.as_f64().unwrap_or_default();
      let y = y.as_f64().unwrap_or_default();
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    _ => Ordering::Equal,
  }
}

#[async_trait]
impl RemoteDataService for MemoryService {
  async fn select(&self, collection: &str, query: &Select) -> Result<Vec<Value>, RemoteError> {
    self.selects.fetch_add(1, AtomicOrdering::SeqCst);
    let mut tables = self.lock();
    tables.take_failure()?;

    let table = tables.resolve(collection).to_string();
    let mut rows: Vec<Value> = tables
      .rows
      .get(&table)
      .map(|rows| {
        rows
          .iter()
          .filter(|row| matches(row, &query.filters))
          .cloned()
          .collect()
      })
      .unwrap_or_default();

    if let Some(order) = &query.order {
      rows.sort_by(|a, b| {
        let ord = compare(a.get(&order.column), b.get(&order.column));
        if order.ascending {
          ord
        } else {
          ord.reverse()
        }
      });
    }
    if let Some(limit) = query.limit {
      rows.truncate(limit);
    }

    if let Some(embed) = &query.embed {
      let related_table = tables.resolve(&embed.relation).to_string();
      let related = tables.rows.get(&related_table).cloned().unwrap_or_default();
      for row in rows.iter_mut() {
        let target = row.get(&embed.local_column).cloned();
        let joined = related
          .iter()
          .find(|r| target.is_some() && r.get(&embed.foreign_column) == target.as_ref())
          .cloned()
          .unwrap_or(Value::Null);
        if let Value::Object(map) = row {
          map.insert(embed.relation.clone(), joined);
        }
      }
    }

    Ok(rows)
  }

  async fn insert(&self, collection: &str, row: Value) -> Result<Vec<Value>, RemoteError> {
    let mut tables = self.lock();
    tables.take_failure()?;

    let Value::Object(mut map) = row else {
      return Err(RemoteError::Api {
        status: 400,
        code: None,
        message: "row must be an object".to_string(),
      });
    };
    if let Some(defaults) = tables.defaults.get(collection) {
      for (column, value) in defaults {
        map.entry(column.clone()).or_insert_with(|| value.clone());
      }
    }
    if !map.contains_key("key") {
      tables.next_key += 1;
      map.insert(
        "key".to_string(),
        Value::String(format!("{}-{}", collection, tables.next_key)),
      );
    }

    let stored = Value::Object(map);
    tables
      .rows
      .entry(collection.to_string())
      .or_default()
      .push(stored.clone());
    Ok(vec![stored])
  }

  async fn update(
    &self,
    collection: &str,
    patch: Value,
    filters: &[Filter],
  ) -> Result<Vec<Value>, RemoteError> {
    let mut tables = self.lock();
    tables.take_failure()?;

    let Value::Object(patch) = patch else {
      return Ok(Vec::new());
    };
    let mut affected = Vec::new();
    if let Some(rows) = tables.rows.get_mut(collection) {
      for row in rows.iter_mut().filter(|row| matches(row, filters)) {
        if let Value::Object(map) = row {
          for (column, value) in &patch {
            map.insert(column.clone(), value.clone());
          }
        }
        affected.push(row.clone());
      }
    }
    Ok(affected)
  }

  async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<usize, RemoteError> {
    let mut tables = self.lock();
    tables.take_failure()?;

    let Some(rows) = tables.rows.get_mut(collection) else {
      return Ok(0);
    };
    let before = rows.len();
    rows.retain(|row| !matches(row, filters));
    Ok(before - rows.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[tokio::test]
  async fn test_filters_order_and_limit() {
    let service = MemoryService::new();
    service.seed(
      "item",
      vec![
        json!({"key": "a", "userId": "u1", "n": 3}),
        json!({"key": "b", "userId": "u1", "n": 9}),
        json!({"key": "c", "userId": "u2", "n": 5}),
        json!({"key": "d", "userId": "u1", "n": 1}),
      ],
    );

    let rows = service
      .select("item", &Select::all().eq("userId", "u1").order("n", false).limit(2))
      .await
      .unwrap();
    let keys: Vec<_> = rows.iter().map(|r| r["key"].as_str().unwrap()).collect();
    assert_eq!(keys, vec!["b", "a"]);
  }

  #[tokio::test]
  async fn test_embed_joins_related_row() {
    let service = MemoryService::new().with_view("itemView", "item");
    service.seed("item", vec![json!({"key": "a", "brand": "Acme"})]);
    service.seed("calendar", vec![json!({"date": "2024-01-01", "itemKey": "a"})]);

    let rows = service
      .select("calendar", &Select::all().embed("itemView", "itemKey", "key"))
      .await
      .unwrap();
    assert_eq!(rows[0]["itemView"]["brand"], "Acme");
  }

  #[tokio::test]
  async fn test_insert_assigns_key_and_defaults() {
    let service = MemoryService::new().with_defaults("item", json!({"totalUseCount": 0}));
    let rows = service.insert("item", json!({"brand": "Acme"})).await.unwrap();
    assert_eq!(rows[0]["key"], "item-1");
    assert_eq!(rows[0]["totalUseCount"], 0);
  }

  #[tokio::test]
  async fn test_injected_failure_is_consumed() {
    let service = MemoryService::new();
    service.fail_next(503, "down");
    assert!(service.select("item", &Select::all()).await.is_err());
    assert!(service.select("item", &Select::all()).await.is_ok());
  }
}
