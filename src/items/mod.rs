//! Data access for items, usage and summaries.
//!
//! Each read binds a semantic query to a cache key and a scoped remote read;
//! each write goes straight to the remote service and then invalidates the
//! item (and genre) cache namespaces so later reads refetch.

mod client;
mod error;
mod keys;
mod mutations;
mod queries;
#[cfg(test)]
mod testing;
mod types;

pub use client::ItemClient;
pub use error::ItemError;
pub use types::{ImageRef, Item, ItemFields, ItemPatch, ItemSummary, NewItem};
