use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    Result, ShareLock,
    store::{KvStore, map_store_err},
};

/// In-memory key-value store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    entries: ShareLock<HashMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemStore {
    fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(map_store_err)?;
        Ok(entries.get(key).cloned())
    }

    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut entries = self.entries.write().map_err(map_store_err)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(
        &self,
        key: &str,
    ) -> Result<()> {
        let mut entries = self.entries.write().map_err(map_store_err)?;
        entries.remove(key);
        Ok(())
    }
}
