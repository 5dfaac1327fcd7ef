//! Who is signed in.
//!
//! Data-access calls never look the user up themselves: callers resolve a
//! `UserContext` from an `AuthContext` once and pass it to every operation.

mod client;
mod session;

use thiserror::Error;

use crate::remote::RemoteError;

pub use client::AuthClient;
pub use session::SessionStore;

/// The signed-in user on whose behalf remote calls are made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
  pub user_id: String,
  pub access_token: Option<String>,
}

/// Source of the current authenticated user.
pub trait AuthContext {
  fn current_user(&self) -> Option<UserContext>;
}

#[derive(Debug, Error)]
pub enum AuthError {
  #[error(transparent)]
  Remote(#[from] RemoteError),

  #[error("session storage error: {0}")]
  Storage(String),

  #[error("not signed in; run `itemlog signin` first")]
  NotSignedIn,
}
