use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::remote::api_types::ApiErrorBody;
use crate::remote::client::{http_client, parse_base_url};
use crate::remote::RemoteError;

use super::session::{Session, SessionStore, SessionUser};
use super::{AuthContext, AuthError, UserContext};

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct ApiTokenResponse {
  access_token: String,
  refresh_token: Option<String>,
  expires_in: Option<i64>,
  expires_at: Option<i64>,
  user: ApiUser,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
  id: String,
  email: Option<String>,
}

impl ApiTokenResponse {
  fn into_session(self) -> Session {
    let expires_at = self
      .expires_at
      .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));
    Session {
      access_token: self.access_token,
      refresh_token: self.refresh_token,
      expires_at,
      user: SessionUser {
        id: self.user.id,
        email: self.user.email,
      },
    }
  }
}

/// Email/password sign-in against the platform's auth endpoint.
pub struct AuthClient {
  http: reqwest::Client,
  auth_url: Url,
  api_key: String,
  store: SessionStore,
}

impl AuthClient {
  pub fn new(config: &Config, store: SessionStore) -> Result<Self> {
    Self::with_http(
      http_client()?,
      &config.supabase.url,
      Config::get_api_key()?,
      store,
    )
  }

  pub fn with_http(
    http: reqwest::Client,
    base_url: &str,
    api_key: String,
    store: SessionStore,
  ) -> Result<Self> {
    let auth_url = parse_base_url(base_url)?
      .join("auth/v1/")
      .map_err(|e| eyre!("Invalid auth url: {}", e))?;

    Ok(Self {
      http,
      auth_url,
      api_key,
      store,
    })
  }

  fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
    self
      .auth_url
      .join(path)
      .map_err(|e| AuthError::Remote(RemoteError::Transport(e.to_string())))
  }

  /// Exchange a grant for a session and persist it.
  async fn request_token(&self, grant_type: &str, body: Value) -> Result<Session, AuthError> {
    let mut url = self.endpoint("token")?;
    url.query_pairs_mut().append_pair("grant_type", grant_type);
    let response = self
      .http
      .post(url)
      .header("apikey", &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(RemoteError::from)?;

    let status = response.status();
    let raw = response.text().await.map_err(RemoteError::from)?;
    if !status.is_success() {
      return Err(ApiErrorBody::parse(status.as_u16(), &raw).into());
    }

    let token: ApiTokenResponse =
      serde_json::from_str(&raw).map_err(|e| RemoteError::Decode(e.to_string()))?;
    let session = token.into_session();
    self.store.save(&session)?;
    Ok(session)
  }

  /// Exchange email and password for a session and persist it.
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
    let session = self
      .request_token("password", json!({ "email": email, "password": password }))
      .await?;
    info!(user_id = %session.user.id, "signed in");
    Ok(session)
  }

  /// Trade the session's refresh token for a new session.
  pub async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
    let refresh_token = session
      .refresh_token
      .as_deref()
      .ok_or(AuthError::NotSignedIn)?;
    let refreshed = self
      .request_token("refresh_token", json!({ "refresh_token": refresh_token }))
      .await?;
    info!(user_id = %refreshed.user.id, "refreshed session");
    Ok(refreshed)
  }

  /// The signed-in user, refreshing an expired session when it can.
  pub async fn current_user(&self) -> Result<UserContext, AuthError> {
    if let Some(user) = self.store.current_user() {
      return Ok(user);
    }
    match self.store.load()? {
      Some(session) if session.refresh_token.is_some() => {
        debug!(user_id = %session.user.id, "session expired");
        Ok(self.refresh(&session).await?.user_context())
      }
      _ => Err(AuthError::NotSignedIn),
    }
  }

  /// Revoke the session remotely (best effort) and forget it locally.
  pub async fn sign_out(&self) -> Result<(), AuthError> {
    if let Some(session) = self.store.load()? {
      let url = self.endpoint("logout")?;
      let result = self
        .http
        .post(url)
        .header("apikey", &self.api_key)
        .bearer_auth(&session.access_token)
        .send()
        .await;
      match result {
        Ok(response) if response.status().is_success() => {}
        Ok(response) => warn!(status = %response.status(), "remote sign-out rejected"),
        Err(e) => warn!(error = %e, "remote sign-out failed"),
      }
    }
    self.store.clear()?;
    info!("signed out");
    Ok(())
  }
}
