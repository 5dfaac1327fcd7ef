//! Serde types matching the platform's REST responses.
//!
//! Rows are kept as raw JSON at the service boundary; these helpers turn them
//! into domain types and turn error bodies into `RemoteError`.

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use super::service::RemoteError;

/// Decode a list of raw rows into typed rows.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> serde_json::Result<Vec<T>> {
  rows.into_iter().map(serde_json::from_value).collect()
}

// ============================================================================
// Error body
// ============================================================================

/// Error payload returned with any non-2xx status.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
  /// A string for the REST interface, a number for the auth endpoints
  pub code: Option<Value>,
  pub details: Option<String>,
  pub hint: Option<String>,
  // The auth endpoints use a different shape
  pub error_description: Option<String>,
  pub msg: Option<String>,
}

impl ApiErrorBody {
  /// Build a `RemoteError` from a status and whatever body came back.
  pub fn into_error(self, status: u16, raw: &str) -> RemoteError {
    let mut message = self
      .message
      .or(self.error_description)
      .or(self.msg)
      .unwrap_or_else(|| {
        if raw.trim().is_empty() {
          format!("HTTP {}", status)
        } else {
          raw.trim().to_string()
        }
      });
    if let Some(details) = self.details.filter(|d| !d.is_empty()) {
      message = format!("{}: {}", message, details);
    }
    if let Some(hint) = self.hint.filter(|h| !h.is_empty()) {
      message = format!("{} (hint: {})", message, hint);
    }
    let code = match self.code {
      None | Some(Value::Null) => None,
      Some(Value::String(code)) => Some(code),
      Some(other) => Some(other.to_string()),
    };
    RemoteError::Api {
      status,
      code,
      message,
    }
  }

  pub fn parse(status: u16, raw: &str) -> RemoteError {
    serde_json::from_str::<ApiErrorBody>(raw)
      .unwrap_or_default()
      .into_error(status, raw)
  }
}
