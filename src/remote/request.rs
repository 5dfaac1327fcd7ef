//! Request model for reads and scoped writes.

use serde_json::Value;

/// Conjunctive equality predicate on a named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
  pub column: String,
  pub value: Value,
}

impl Filter {
  pub fn eq(column: &str, value: impl Into<Value>) -> Self {
    Self {
      column: column.to_string(),
      value: value.into(),
    }
  }

  /// Render the value the way the REST dialect expects it in a query string.
  pub fn value_param(&self) -> String {
    match &self.value {
      Value::String(s) => s.clone(),
      Value::Null => "null".to_string(),
      other => other.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
  pub column: String,
  pub ascending: bool,
}

/// A related collection pulled into each row under its own name.
///
/// `local_column` on the queried row references `foreign_column` on the
/// related collection. The hosted platform resolves the join itself from its
/// foreign keys, so the column names only matter to in-process services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
  pub relation: String,
  pub local_column: String,
  pub foreign_column: String,
}

/// A filtered, ordered, limited read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
  pub embed: Option<Embed>,
  pub filters: Vec<Filter>,
  pub order: Option<Order>,
  pub limit: Option<usize>,
}

impl Select {
  /// Select every column.
  pub fn all() -> Self {
    Self::default()
  }

  pub fn embed(mut self, relation: &str, local_column: &str, foreign_column: &str) -> Self {
    self.embed = Some(Embed {
      relation: relation.to_string(),
      local_column: local_column.to_string(),
      foreign_column: foreign_column.to_string(),
    });
    self
  }

  pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
    self.filters.push(Filter::eq(column, value));
    self
  }

  pub fn order(mut self, column: &str, ascending: bool) -> Self {
    self.order = Some(Order {
      column: column.to_string(),
      ascending,
    });
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Value of the `select` query parameter.
  pub fn columns_param(&self) -> String {
    match &self.embed {
      Some(embed) => format!("*,{}(*)", embed.relation),
      None => "*".to_string(),
    }
  }

  /// All query parameters, in a stable order.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = vec![("select".to_string(), self.columns_param())];
    pairs.extend(filter_pairs(&self.filters));
    if let Some(order) = &self.order {
      let direction = if order.ascending { "asc" } else { "desc" };
      pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = self.limit {
      pairs.push(("limit".to_string(), limit.to_string()));
    }
    pairs
  }
}

/// `column=eq.value` pairs for a filter list.
pub fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
  filters
    .iter()
    .map(|f| (f.column.clone(), format!("eq.{}", f.value_param())))
    .collect()
}
