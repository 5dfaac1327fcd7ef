//! Remote data platform access.
//!
//! The hosted platform owns storage, query execution and row-level access.
//! This module only describes reads and writes against named collections and
//! ships them over HTTP:
//! - `RemoteDataService` is the capability every caller depends on
//! - `Select` / `Filter` / `Order` describe a read
//! - `PostgrestClient` speaks the platform's REST dialect

pub mod api_types;
pub mod client;
#[cfg(test)]
pub mod http_stub;
#[cfg(test)]
pub mod memory;
mod request;
mod service;

pub use client::PostgrestClient;
pub use request::{Filter, Select};
pub use service::{RemoteDataService, RemoteError};
