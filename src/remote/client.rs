use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Config;

use super::api_types::ApiErrorBody;
use super::request::{filter_pairs, Filter, Select};
use super::service::{RemoteDataService, RemoteError};

/// HTTP client for the platform's REST interface.
#[derive(Clone)]
pub struct PostgrestClient {
  http: reqwest::Client,
  rest_url: Url,
  api_key: String,
  bearer: String,
}

impl PostgrestClient {
  /// Create an anonymous client. Use `with_access_token` to act as a user.
  pub fn new(config: &Config) -> Result<Self> {
    Self::with_http(http_client()?, &config.supabase.url, Config::get_api_key()?)
  }

  /// Build on an existing HTTP client against the project at `base_url`.
  pub fn with_http(http: reqwest::Client, base_url: &str, api_key: String) -> Result<Self> {
    let rest_url = parse_base_url(base_url)?
      .join("rest/v1/")
      .map_err(|e| eyre!("Invalid REST url: {}", e))?;

    Ok(Self {
      http,
      rest_url,
      bearer: api_key.clone(),
      api_key,
    })
  }

  /// Send the signed-in user's token so row-level policies apply.
  pub fn with_access_token(mut self, token: &str) -> Self {
    self.bearer = token.to_string();
    self
  }

  fn headers(&self) -> Result<HeaderMap, RemoteError> {
    let mut headers = HeaderMap::new();
    let api_key = HeaderValue::from_str(&self.api_key)
      .map_err(|e| RemoteError::Transport(format!("invalid api key header: {}", e)))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {}", self.bearer))
      .map_err(|e| RemoteError::Transport(format!("invalid authorization header: {}", e)))?;
    headers.insert("apikey", api_key);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
  }

  fn collection_url(&self, collection: &str) -> Result<Url, RemoteError> {
    self
      .rest_url
      .join(collection)
      .map_err(|e| RemoteError::Transport(format!("invalid collection {}: {}", collection, e)))
  }

  /// Execute a request and decode the JSON row array it returns.
  async fn send(&self, request: reqwest::RequestBuilder) -> Result<Vec<Value>, RemoteError> {
    let response = request.headers(self.headers()?).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
      return Err(ApiErrorBody::parse(status.as_u16(), &body));
    }
    if body.trim().is_empty() {
      return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(&body).map_err(|e| RemoteError::Decode(e.to_string()))? {
      Value::Array(rows) => Ok(rows),
      Value::Object(row) => Ok(vec![Value::Object(row)]),
      other => Err(RemoteError::Decode(format!("expected rows, got {}", other))),
    }
  }
}

#[async_trait]
impl RemoteDataService for PostgrestClient {
  async fn select(&self, collection: &str, query: &Select) -> Result<Vec<Value>, RemoteError> {
    debug!(collection, params = ?query.query_pairs(), "select");
    let url = self.collection_url(collection)?;
    self
      .send(self.http.get(url).query(&query.query_pairs()))
      .await
  }

  async fn insert(&self, collection: &str, row: Value) -> Result<Vec<Value>, RemoteError> {
    debug!(collection, "insert");
    let url = self.collection_url(collection)?;
    self
      .send(
        self
          .http
          .post(url)
          .header("Prefer", "return=representation")
          .json(&row),
      )
      .await
  }

  async fn update(
    &self,
    collection: &str,
    patch: Value,
    filters: &[Filter],
  ) -> Result<Vec<Value>, RemoteError> {
    debug!(collection, params = ?filter_pairs(filters), "update");
    let url = self.collection_url(collection)?;
    self
      .send(
        self
          .http
          .patch(url)
          .query(&filter_pairs(filters))
          .header("Prefer", "return=representation")
          .json(&patch),
      )
      .await
  }

  async fn delete(&self, collection: &str, filters: &[Filter]) -> Result<usize, RemoteError> {
    debug!(collection, params = ?filter_pairs(filters), "delete");
    let url = self.collection_url(collection)?;
    let removed = self
      .send(
        self
          .http
          .delete(url)
          .query(&filter_pairs(filters))
          .header("Prefer", "return=representation"),
      )
      .await?;
    Ok(removed.len())
  }
}

/// HTTP client shared by the REST and auth endpoints.
pub fn http_client() -> Result<reqwest::Client> {
  reqwest::Client::builder()
    .user_agent(concat!("itemlog/", env!("CARGO_PKG_VERSION")))
    .build()
    .map_err(|e| eyre!("Failed to create HTTP client: {}", e))
}

/// Parse the project URL, making sure relative joins keep its full path.
pub fn parse_base_url(raw: &str) -> Result<Url> {
  let mut url = Url::parse(raw.trim()).map_err(|e| eyre!("Invalid platform url {}: {}", raw, e))?;
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}
