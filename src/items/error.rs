use thiserror::Error;

use crate::cache::CacheError;
use crate::remote::RemoteError;

#[derive(Debug, Error)]
pub enum ItemError {
  /// The remote service rejected the call or could not be reached.
  #[error(transparent)]
  Remote(#[from] RemoteError),

  /// The insert succeeded but returned no row.
  #[error("insert failed")]
  InsertFailed,

  /// The update succeeded but matched no row owned by the user.
  #[error("update failed")]
  UpdateFailed,

  #[error("unexpected row shape: {0}")]
  Decode(#[from] serde_json::Error),

  #[error(transparent)]
  Cache(#[from] CacheError),
}

pub type ItemResult<T> = Result<T, ItemError>;
