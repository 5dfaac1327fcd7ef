//! Query cache for remote reads.
//!
//! This module is domain-agnostic:
//! - Results are cached whole, as JSON, under a hashed query key
//! - Keys belong to a namespace; writes invalidate a namespace at once
//! - At most one fetch per key is in flight at a time
//! - Backends: in-memory, SQLite (survives restarts), or none

mod layer;
pub(crate) mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, MemoryStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheError, QueryKey};
