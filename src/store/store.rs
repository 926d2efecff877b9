use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::{DiagflowError, Result};

use super::{KvStore, MemStore};

/// Typed JSON facade over a [`KvStore`].
#[derive(Clone)]
pub struct Store {
    kv: Arc<dyn KvStore>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Arc::new(MemStore::new()))
    }
}

impl Store {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
        }
    }

    pub fn kv(&self) -> Arc<dyn KvStore> {
        self.kv.clone()
    }

    /// Reads and decodes the value under `key`. A missing key yields `None`.
    pub fn get_json<T>(
        &self,
        key: &str,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        trace!("store::get_json({})", key);
        match self.kv.get(key)? {
            Some(text) => {
                let value = serde_json::from_str(&text).map_err(|e| DiagflowError::Store(format!("corrupt value under {}: {}", key, e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Encodes `value` and writes it under `key`, overwriting the previous value.
    pub fn set_json<T>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        trace!("store::set_json({})", key);
        let text = serde_json::to_string(value)?;
        self.kv.set(key, &text)
    }

    pub fn remove(
        &self,
        key: &str,
    ) -> Result<()> {
        trace!("store::remove({})", key);
        self.kv.remove(key)
    }
}
