//! Storage layer for user templates and the offline mutation queue.
//!
//! Everything the library keeps between sessions goes through the small
//! [`KvStore`] port (get/set/remove by key), so the backing store can be
//! swapped for an embedded one or mocked in tests:
//! - `MemStore`: in-memory storage for testing
//! - `FileStore`: one JSON file per key in a directory

mod db;
mod store;

use std::error::Error;

use crate::{DiagflowError, Result};

pub use db::{FileStore, MemStore};
pub use store::Store;

/// Maps backing-store errors to DiagflowError.
fn map_store_err(err: impl Error) -> DiagflowError {
    DiagflowError::Store(err.to_string())
}

/// Key-value persistence port.
pub trait KvStore: Send + Sync {
    /// Returns the raw value stored under `key`, if any.
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(
        &self,
        key: &str,
    ) -> Result<()>;
}
