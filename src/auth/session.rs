use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{AuthContext, AuthError, UserContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id: String,
  pub email: Option<String>,
}

/// A signed-in session as issued by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub access_token: String,
  pub refresh_token: Option<String>,
  /// Unix timestamp (seconds) after which the access token is rejected
  pub expires_at: Option<i64>,
  pub user: SessionUser,
}

impl Session {
  pub fn is_expired(&self) -> bool {
    self
      .expires_at
      .map(|at| at <= Utc::now().timestamp())
      .unwrap_or(false)
  }

  pub fn user_context(&self) -> UserContext {
    UserContext {
      user_id: self.user.id.clone(),
      access_token: Some(self.access_token.clone()),
    }
  }
}

/// Session persisted as JSON on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  /// Store under the data directory as `session.json`.
  pub fn in_dir(dir: &Path) -> Self {
    Self::new(dir.join("session.json"))
  }

  pub fn load(&self) -> Result<Option<Session>, AuthError> {
    if !self.path.exists() {
      return Ok(None);
    }
    let contents = std::fs::read_to_string(&self.path).map_err(|e| {
      AuthError::Storage(format!(
        "Failed to read session {}: {}",
        self.path.display(),
        e
      ))
    })?;
    let session = serde_json::from_str(&contents)
      .map_err(|e| AuthError::Storage(format!("Corrupt session file: {}", e)))?;
    Ok(Some(session))
  }

  /// Write the session, readable by the owner only.
  pub fn save(&self, session: &Session) -> Result<(), AuthError> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| AuthError::Storage(format!("Failed to create session directory: {}", e)))?;
    }
    let data = serde_json::to_vec_pretty(session)
      .map_err(|e| AuthError::Storage(format!("Failed to serialize session: {}", e)))?;
    write_private(&self.path, &data)
      .map_err(|e| AuthError::Storage(format!("Failed to write session: {}", e)))
  }

  /// Remove the stored session. Missing file is not an error.
  pub fn clear(&self) -> Result<(), AuthError> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(AuthError::Storage(format!("Failed to remove session: {}", e))),
    }
  }
}

fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
  let mut options = OpenOptions::new();
  options.write(true).create(true).truncate(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600);
  }
  let mut file = options.open(path)?;
  // A file left by an older build keeps its mode on open
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
  }
  file.write_all(data)
}

impl AuthContext for SessionStore {
  fn current_user(&self) -> Option<UserContext> {
    match self.load() {
      Ok(Some(session)) if !session.is_expired() => Some(session.user_context()),
      Ok(_) => None,
      Err(e) => {
        warn!(error = %e, "ignoring unreadable session");
        None
      }
    }
  }
}
